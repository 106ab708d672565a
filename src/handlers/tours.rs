use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::Repository;
use crate::error::ApiError;
use crate::models::tour::{NewTour, TourUpdate};
use crate::models::Tour;
use crate::query::QuerySpec;
use crate::state::AppState;

const DIFFICULTIES: &[&str] = &["easy", "medium", "difficult"];

fn tours_repo(state: &AppState) -> Repository<Tour> {
    Repository::new("tours", state.db.clone()).with_columns(Tour::COLUMNS)
}

fn validate_new_tour(new: &NewTour) -> Result<(), ApiError> {
    let mut errors = HashMap::new();
    if new.name.trim().is_empty() {
        errors.insert("name".to_string(), "A tour must have a name".to_string());
    }
    if new.duration < 1 {
        errors.insert(
            "duration".to_string(),
            "A tour must last at least one day".to_string(),
        );
    }
    if new.max_group_size < 1 {
        errors.insert(
            "max_group_size".to_string(),
            "A tour must have a group size".to_string(),
        );
    }
    if !DIFFICULTIES.contains(&new.difficulty.as_str()) {
        errors.insert(
            "difficulty".to_string(),
            "Difficulty is either: easy, medium, difficult".to_string(),
        );
    }
    if new.price <= 0.0 {
        errors.insert("price".to_string(), "A tour must have a price".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation("Invalid input data", Some(errors)))
    }
}

pub async fn list_tours(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let spec = QuerySpec::from_params(&params, &state.config.query)?;
    let tours = tours_repo(&state).list(&spec).await?;

    Ok(Json(json!({
        "success": true,
        "results": tours.len(),
        "data": { "tours": tours },
    })))
}

pub async fn get_tour(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let tour = tours_repo(&state).find_by_id(id).await?;
    Ok(Json(json!({ "success": true, "data": { "tour": tour } })))
}

pub async fn create_tour(
    State(state): State<AppState>,
    Json(new): Json<NewTour>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate_new_tour(&new)?;
    // Duplicate tour names hit the unique index and surface as 409
    let tour = Tour::insert(&state.db, &new).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": { "tour": tour } })),
    ))
}

pub async fn update_tour(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TourUpdate>,
) -> Result<Json<Value>, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }
    if let Some(difficulty) = &patch.difficulty {
        if !DIFFICULTIES.contains(&difficulty.as_str()) {
            return Err(ApiError::bad_request(
                "Difficulty is either: easy, medium, difficult",
            ));
        }
    }

    let tour = Tour::update(&state.db, id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("No record found with that ID"))?;

    Ok(Json(json!({ "success": true, "data": { "tour": tour } })))
}

pub async fn delete_tour(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    tours_repo(&state).delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_tour() -> NewTour {
        NewTour {
            name: "The Forest Hiker".into(),
            duration: 5,
            max_group_size: 25,
            difficulty: "easy".into(),
            price: 397.0,
            summary: "Breathtaking hike".into(),
            description: String::new(),
        }
    }

    #[test]
    fn accepts_a_well_formed_tour() {
        assert!(validate_new_tour(&valid_tour()).is_ok());
    }

    #[test]
    fn rejects_unknown_difficulty() {
        let mut tour = valid_tour();
        tour.difficulty = "extreme".into();
        let err = validate_new_tour(&tour).unwrap_err();
        assert!(err.to_json()["field_errors"]["difficulty"].is_string());
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut tour = valid_tour();
        tour.price = 0.0;
        assert!(validate_new_tour(&tour).is_err());
    }
}

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::Repository;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::models::review::{NewReview, ReviewUpdate};
use crate::models::{Review, Tour};
use crate::query::QuerySpec;
use crate::state::AppState;

fn reviews_repo(state: &AppState) -> Repository<Review> {
    Repository::new("reviews", state.db.clone()).with_columns(Review::COLUMNS)
}

fn validate_review(body: &str, rating: f64) -> Result<(), ApiError> {
    let mut errors = HashMap::new();
    if body.trim().is_empty() {
        errors.insert("body".to_string(), "Review can not be empty".to_string());
    }
    if !(1.0..=5.0).contains(&rating) {
        errors.insert(
            "rating".to_string(),
            "Rating must be between 1.0 and 5.0".to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation("Invalid input data", Some(errors)))
    }
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let spec = QuerySpec::from_params(&params, &state.config.query)?;
    let reviews = reviews_repo(&state).list(&spec).await?;

    Ok(Json(json!({
        "success": true,
        "results": reviews.len(),
        "data": { "reviews": reviews },
    })))
}

/// Nested listing, scoped to one tour.
pub async fn list_tour_reviews(
    State(state): State<AppState>,
    Path(tour_id): Path<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let spec = QuerySpec::from_params(&params, &state.config.query)?
        .with_eq("tour_id", json!(tour_id))?;
    let reviews = reviews_repo(&state).list(&spec).await?;

    Ok(Json(json!({
        "success": true,
        "results": reviews.len(),
        "data": { "reviews": reviews },
    })))
}

async fn create(
    state: &AppState,
    author: &CurrentUser,
    tour_id: Uuid,
    new: &NewReview,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate_review(&new.body, new.rating)?;

    // 404 before the FK gets a chance to fire
    let _: Tour = Repository::new("tours", state.db.clone())
        .find_by_id(tour_id)
        .await?;

    // One review per user per tour, enforced by the unique index
    let review = Review::insert(&state.db, new.body.trim(), new.rating, tour_id, author.id).await?;
    Review::recalc_tour_ratings(&state.db, tour_id).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": { "review": review } })),
    ))
}

pub async fn create_review(
    State(state): State<AppState>,
    author: CurrentUser,
    Json(new): Json<NewReview>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let tour_id = new
        .tour_id
        .ok_or_else(|| ApiError::bad_request("A review must belong to a tour"))?;
    create(&state, &author, tour_id, &new).await
}

/// Nested creation: the tour comes from the path, not the body.
pub async fn create_tour_review(
    State(state): State<AppState>,
    author: CurrentUser,
    Path(tour_id): Path<Uuid>,
    Json(new): Json<NewReview>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create(&state, &author, tour_id, &new).await
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let review = reviews_repo(&state).find_by_id(id).await?;
    Ok(Json(json!({ "success": true, "data": { "review": review } })))
}

pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ReviewUpdate>,
) -> Result<Json<Value>, ApiError> {
    if patch.body.is_none() && patch.rating.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }
    if let Some(rating) = patch.rating {
        if !(1.0..=5.0).contains(&rating) {
            return Err(ApiError::bad_request("Rating must be between 1.0 and 5.0"));
        }
    }

    let review = Review::update(&state.db, id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("No record found with that ID"))?;
    Review::recalc_tour_ratings(&state.db, review.tour_id).await;

    Ok(Json(json!({ "success": true, "data": { "review": review } })))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    // Fetch first so the aggregate can be recomputed for the right tour
    let review: Review = reviews_repo(&state).find_by_id(id).await?;
    reviews_repo(&state).delete_by_id(id).await?;
    Review::recalc_tour_ratings(&state.db, review.tour_id).await;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(validate_review("Great trip", 1.0).is_ok());
        assert!(validate_review("Great trip", 5.0).is_ok());
        assert!(validate_review("Great trip", 0.9).is_err());
        assert!(validate_review("Great trip", 5.1).is_err());
    }

    #[test]
    fn empty_body_is_rejected() {
        assert!(validate_review("   ", 4.0).is_err());
    }
}

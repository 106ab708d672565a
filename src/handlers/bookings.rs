use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::Repository;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::models::booking::NewBooking;
use crate::models::{Booking, Tour};
use crate::query::QuerySpec;
use crate::state::AppState;

fn bookings_repo(state: &AppState) -> Repository<Booking> {
    Repository::new("bookings", state.db.clone()).with_columns(Booking::COLUMNS)
}

/// Start the payment flow for a tour. The client follows the returned
/// session URL; the provider (or the local stub) redirects back when done.
pub async fn checkout_session(
    State(state): State<AppState>,
    buyer: CurrentUser,
    Path(tour_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let tour: Tour = Repository::new("tours", state.db.clone())
        .find_by_id(tour_id)
        .await?;

    let session = state.checkout.create_session(&tour, &buyer.email).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "session": session },
    })))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let spec = QuerySpec::from_params(&params, &state.config.query)?;
    let bookings = bookings_repo(&state).list(&spec).await?;

    Ok(Json(json!({
        "success": true,
        "results": bookings.len(),
        "data": { "bookings": bookings },
    })))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let booking = bookings_repo(&state).find_by_id(id).await?;
    Ok(Json(json!({ "success": true, "data": { "booking": booking } })))
}

pub async fn create_booking(
    State(state): State<AppState>,
    Json(new): Json<NewBooking>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if new.price <= 0.0 {
        return Err(ApiError::bad_request("A booking must have a price"));
    }

    let booking = Booking::insert(&state.db, &new).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": { "booking": booking } })),
    ))
}

pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    bookings_repo(&state).delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::Repository;
use crate::error::ApiError;
use crate::middleware::{CurrentUser, OptionalUser};
use crate::models::{Role, User};
use crate::query::QuerySpec;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    // Captured only so the request can be rejected with a pointer to the
    // password route instead of silently ignoring the field
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub role: Option<Role>,
}

fn users_repo(state: &AppState) -> Repository<User> {
    Repository::new("users", state.db.clone())
        .with_active_guard()
        .with_columns(User::COLUMNS)
}

pub async fn get_me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let user = users_repo(&state).find_by_id(current.id).await?;
    Ok(Json(json!({ "success": true, "data": { "user": user } })))
}

/// Session check for browser clients: reports the logged-in viewer or
/// `null` without ever rejecting the request.
pub async fn session(viewer: OptionalUser) -> Json<Value> {
    Json(json!({ "success": true, "data": { "user": viewer.0 } }))
}

pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<UpdateMeRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.password.is_some() || req.password_confirm.is_some() {
        return Err(ApiError::bad_request(
            "This route is not for password updates. Please use /update-my-password",
        ));
    }

    if let Some(email) = &req.email {
        if !email.contains('@') {
            let mut errors = HashMap::new();
            errors.insert("email".to_string(), "Please provide a valid email".to_string());
            return Err(ApiError::validation("Invalid input data", Some(errors)));
        }
    }

    let user = User::update_profile(
        &state.db,
        current.id,
        req.name.as_deref(),
        req.email.as_deref(),
        req.photo.as_deref(),
    )
    .await?;

    Ok(Json(json!({ "success": true, "data": { "user": user } })))
}

pub async fn delete_me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, ApiError> {
    User::soft_delete(&state.db, current.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Admin surface below. Routing wires these behind the admin role gate.

pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let spec = QuerySpec::from_params(&params, &state.config.query)?;
    let users = users_repo(&state).list(&spec).await?;

    Ok(Json(json!({
        "success": true,
        "results": users.len(),
        "data": { "users": users },
    })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user = users_repo(&state).find_by_id(id).await?;
    Ok(Json(json!({ "success": true, "data": { "user": user } })))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdminUpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.name.is_none() && req.email.is_none() && req.photo.is_none() && req.role.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let mut user = User::update_profile(
        &state.db,
        id,
        req.name.as_deref(),
        req.email.as_deref(),
        req.photo.as_deref(),
    )
    .await?;

    if let Some(role) = req.role {
        user = User::update_role(&state.db, id, role).await?;
    }

    Ok(Json(json!({ "success": true, "data": { "user": user } })))
}

/// Hard delete, unlike the self-service soft delete.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    Repository::<User>::new("users", state.db.clone())
        .delete_by_id(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

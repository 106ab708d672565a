use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
pub mod services;
pub mod state;

use handlers::{auth as auth_handlers, bookings, reviews, tours, users};
use middleware::{require_auth, restrict_to};
use models::Role;
use state::AppState;

const ADMIN_ONLY: &[Role] = &[Role::Admin];
const STAFF: &[Role] = &[Role::Admin, Role::LeadGuide];
const REVIEWERS: &[Role] = &[Role::User];
const REVIEW_EDITORS: &[Role] = &[Role::User, Role::Admin];

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(user_routes(state.clone()))
        .merge(tour_routes(state.clone()))
        .merge(review_routes(state.clone()))
        .merge(booking_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn user_routes(state: AppState) -> Router<AppState> {
    let authed = Router::new()
        .route(
            "/api/v1/users/update-my-password",
            patch(auth_handlers::update_my_password),
        )
        .route(
            "/api/v1/users/me",
            get(users::get_me)
                .patch(users::update_me)
                .delete(users::delete_me),
        )
        .layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/api/v1/users", get(users::list_users))
        .route(
            "/api/v1/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .layer(from_fn(|req, next| restrict_to(ADMIN_ONLY, req, next)))
        .layer(from_fn_with_state(state, require_auth));

    Router::new()
        .route("/api/v1/users/signup", post(auth_handlers::signup))
        .route("/api/v1/users/login", post(auth_handlers::login))
        .route("/api/v1/users/logout", get(auth_handlers::logout))
        .route(
            "/api/v1/users/forgot-password",
            post(auth_handlers::forgot_password),
        )
        .route(
            "/api/v1/users/reset-password/:token",
            patch(auth_handlers::reset_password),
        )
        .route("/api/v1/users/session", get(users::session))
        .merge(authed)
        .merge(admin)
}

fn tour_routes(state: AppState) -> Router<AppState> {
    let staff = Router::new()
        .route("/api/v1/tours", post(tours::create_tour))
        .route(
            "/api/v1/tours/:id",
            patch(tours::update_tour).delete(tours::delete_tour),
        )
        .layer(from_fn(|req, next| restrict_to(STAFF, req, next)))
        .layer(from_fn_with_state(state, require_auth));

    Router::new()
        .route("/api/v1/tours", get(tours::list_tours))
        .route("/api/v1/tours/:id", get(tours::get_tour))
        .merge(staff)
}

fn review_routes(state: AppState) -> Router<AppState> {
    let create = Router::new()
        .route("/api/v1/reviews", post(reviews::create_review))
        .route(
            "/api/v1/tours/:id/reviews",
            post(reviews::create_tour_review),
        )
        .layer(from_fn(|req, next| restrict_to(REVIEWERS, req, next)));

    let edit = Router::new()
        .route(
            "/api/v1/reviews/:id",
            patch(reviews::update_review).delete(reviews::delete_review),
        )
        .layer(from_fn(|req, next| restrict_to(REVIEW_EDITORS, req, next)));

    Router::new()
        .route("/api/v1/reviews", get(reviews::list_reviews))
        .route("/api/v1/reviews/:id", get(reviews::get_review))
        .route("/api/v1/tours/:id/reviews", get(reviews::list_tour_reviews))
        .merge(create)
        .merge(edit)
        .layer(from_fn_with_state(state, require_auth))
}

fn booking_routes(state: AppState) -> Router<AppState> {
    let staff = Router::new()
        .route(
            "/api/v1/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route(
            "/api/v1/bookings/:id",
            get(bookings::get_booking).delete(bookings::delete_booking),
        )
        .layer(from_fn(|req, next| restrict_to(STAFF, req, next)));

    Router::new()
        .route(
            "/api/v1/bookings/checkout-session/:tour_id",
            get(bookings::checkout_session),
        )
        .merge(staff)
        .layer(from_fn_with_state(state, require_auth))
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Trailhead API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Tour booking REST backend",
            "endpoints": {
                "health": "/health (public)",
                "users": "/api/v1/users/* (signup, login, reset flow, profile)",
                "tours": "/api/v1/tours (public listing, staff mutations)",
                "reviews": "/api/v1/reviews, /api/v1/tours/:id/reviews (protected)",
                "bookings": "/api/v1/bookings/* (protected)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match db::health_check(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": { "status": "degraded", "timestamp": now, "database_error": e.to_string() }
            })),
        ),
    }
}

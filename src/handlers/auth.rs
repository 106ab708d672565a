use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{password, reset, AuthError};
use crate::error::ApiError;
use crate::middleware::{CurrentUser, SESSION_COOKIE};
use crate::models::User;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub password_current: String,
    pub password: String,
    pub password_confirm: String,
}

fn validate_new_password(
    password: &str,
    confirm: &str,
    errors: &mut HashMap<String, String>,
) {
    if password.len() < 8 {
        errors.insert(
            "password".into(),
            "Password must be at least 8 characters".into(),
        );
    }
    if password != confirm {
        errors.insert(
            "password_confirm".into(),
            "Passwords do not match".into(),
        );
    }
}

fn reject_if_invalid(errors: HashMap<String, String>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation("Invalid input data", Some(errors)))
    }
}

/// Issue a fresh token for `user`: bearer token in the body plus the
/// mirroring `jwt` cookie. Cookies are HttpOnly always and Secure in
/// production only.
fn respond_with_token(
    state: &AppState,
    jar: CookieJar,
    user: User,
    status: StatusCode,
) -> Result<(StatusCode, CookieJar, Json<Value>), ApiError> {
    let token = state.tokens.sign(user.id)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.environment.is_production())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(state.config.jwt.cookie_expires_days))
        .build();

    Ok((
        status,
        jar.add(cookie),
        Json(json!({
            "success": true,
            "token": token,
            "data": { "user": user },
        })),
    ))
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<Value>), ApiError> {
    let mut errors = HashMap::new();
    if req.name.trim().is_empty() {
        errors.insert("name".into(), "Please tell us your name".into());
    }
    if !req.email.contains('@') {
        errors.insert("email".into(), "Please provide a valid email".into());
    }
    validate_new_password(&req.password, &req.password_confirm, &mut errors);
    reject_if_invalid(errors)?;

    let hash = password::hash_password(&req.password)?;
    // Duplicate email surfaces as 409 via the unique constraint
    let user = User::insert(&state.db, req.name.trim(), &req.email, &hash).await?;

    let account_url = format!("{}/me", state.config.public_url);
    if let Err(e) = state
        .mailer
        .send_welcome(&user.email, &user.name, &account_url)
        .await
    {
        tracing::warn!(user_id = %user.id, "welcome email failed: {e}");
    }

    respond_with_token(&state, jar, user, StatusCode::CREATED)
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<Value>), ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Please provide email and password"));
    }

    // Soft-deleted accounts are excluded here, so they fail like any
    // other bad credential instead of revealing their state
    let user = User::find_active_by_email(&state.db, &req.email)
        .await?
        .ok_or(AuthError::BadCredentials)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(AuthError::BadCredentials.into());
    }

    respond_with_token(&state, jar, user, StatusCode::OK)
}

/// Overwrite the session cookie with a short-lived dummy value. Clients
/// holding only a bearer token simply drop it.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let cookie = Cookie::build((SESSION_COOKIE, "logged-out"))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(10))
        .build();

    (jar.add(cookie), Json(json!({ "success": true })))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = User::find_active_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::not_found("There is no user with that email address"))?;

    let token = reset::generate();
    User::store_reset_token(&state.db, user.id, &token.hash, token.expires_at).await?;

    let reset_url = format!(
        "{}/api/v1/users/reset-password/{}",
        state.config.public_url, token.raw
    );

    if let Err(e) = state
        .mailer
        .send_password_reset(&user.email, &user.name, &reset_url)
        .await
    {
        tracing::error!(user_id = %user.id, "password reset email failed: {e}");
        User::clear_reset_token(&state.db, user.id).await?;
        return Err(ApiError::internal(
            "There was an error sending the email. Try again later",
        ));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Token sent to email",
    })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<(StatusCode, CookieJar, Json<Value>), ApiError> {
    let mut errors = HashMap::new();
    validate_new_password(&req.password, &req.password_confirm, &mut errors);
    reject_if_invalid(errors)?;

    // Constant-time match against every outstanding digest; expired or
    // already-redeemed tokens fall through to the same error
    let now = Utc::now();
    let user = User::find_reset_candidates(&state.db)
        .await?
        .into_iter()
        .find(|u| {
            reset::redeemable(
                u.password_reset_token.as_deref(),
                u.password_reset_expires,
                &token,
                now,
            )
        })
        .ok_or(AuthError::ResetTokenInvalid)?;

    let hash = password::hash_password(&req.password)?;
    let user = User::update_password(&state.db, user.id, &hash).await?;

    respond_with_token(&state, jar, user, StatusCode::OK)
}

pub async fn update_my_password(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<(StatusCode, CookieJar, Json<Value>), ApiError> {
    let mut errors = HashMap::new();
    validate_new_password(&req.password, &req.password_confirm, &mut errors);
    reject_if_invalid(errors)?;

    let user = User::find_active_by_id(&state.db, current.id)
        .await?
        .ok_or(AuthError::PrincipalGone)?;

    if !password::verify_password(&req.password_current, &user.password_hash)? {
        return Err(ApiError::unauthorized("Your current password is wrong"));
    }

    let hash = password::hash_password(&req.password)?;
    let user = User::update_password(&state.db, user.id, &hash).await?;

    respond_with_token(&state, jar, user, StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AppConfig, CheckoutConfig, DatabaseConfig, EmailConfig, Environment, JwtConfig,
        QueryConfig,
    };
    use crate::models::Role;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn test_config(environment: Environment) -> AppConfig {
        AppConfig {
            environment,
            port: 3000,
            public_url: "http://localhost:3000".into(),
            database: DatabaseConfig {
                url: "postgres://localhost/unused".into(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: "test-secret".into(),
                expires_in_hours: 24,
                cookie_expires_days: 7,
            },
            query: QueryConfig {
                default_page_size: 100,
                max_page_size: 100,
            },
            email: EmailConfig {
                smtp_host: None,
                smtp_port: 587,
                smtp_username: None,
                smtp_password: None,
                from_name: "Trailhead".into(),
                from_address: "hello@trailhead.example".into(),
            },
            checkout: CheckoutConfig {
                endpoint: None,
                api_key: None,
                currency: "usd".into(),
                success_url: "http://localhost:3000/my-bookings".into(),
                cancel_url: "http://localhost:3000".into(),
            },
        }
    }

    fn test_state(environment: Environment) -> AppState {
        // Lazy pool: nothing connects unless a query actually runs
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool");
        AppState::new(pool, test_config(environment))
    }

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            photo: "default.jpg".into(),
            role: Role::User,
            password_hash: "$argon2id$fake".into(),
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn signup_response_sets_http_only_cookie_and_hides_credentials() {
        let state = test_state(Environment::Development);
        let (status, jar, body) =
            respond_with_token(&state, CookieJar::new(), sample_user(), StatusCode::CREATED)
                .expect("respond");

        assert_eq!(status, StatusCode::CREATED);

        let cookie = jar.get(SESSION_COOKIE).expect("jwt cookie");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));

        let body = body.0;
        assert_eq!(body["success"], true);
        let token = body["token"].as_str().expect("token in body");
        assert!(!token.is_empty());
        assert_eq!(cookie.value(), token);

        let user = body["data"]["user"].as_object().expect("user object");
        assert!(user.contains_key("email"));
        assert!(!user.contains_key("password_hash"));
        assert!(!user.contains_key("password_reset_token"));
    }

    #[tokio::test]
    async fn session_cookie_is_secure_only_in_production() {
        let state = test_state(Environment::Production);
        let (_, jar, _) =
            respond_with_token(&state, CookieJar::new(), sample_user(), StatusCode::OK)
                .expect("respond");

        assert_eq!(jar.get(SESSION_COOKIE).expect("jwt cookie").secure(), Some(true));
    }

    #[test]
    fn short_password_is_rejected() {
        let mut errors = HashMap::new();
        validate_new_password("short", "short", &mut errors);
        assert!(errors.contains_key("password"));
        assert!(!errors.contains_key("password_confirm"));
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let mut errors = HashMap::new();
        validate_new_password("long-enough-1", "long-enough-2", &mut errors);
        assert!(errors.contains_key("password_confirm"));
    }

    #[test]
    fn matching_long_password_passes() {
        let mut errors = HashMap::new();
        validate_new_password("long-enough-1", "long-enough-1", &mut errors);
        assert!(errors.is_empty());
        assert!(reject_if_invalid(errors).is_ok());
    }
}

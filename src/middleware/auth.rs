use std::convert::Infallible;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::error::ApiError;
use crate::models::{Role, User};
use crate::state::AppState;

/// Name of the session cookie that mirrors the bearer token.
pub const SESSION_COOKIE: &str = "jwt";

/// The authenticated principal, stored in request extensions by
/// `require_auth` and read back by handlers via the extractor.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub role: Role,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            photo: user.photo,
            role: user.role,
        }
    }
}

/// Pull the token from the Authorization header, falling back to the
/// session cookie for browser clients. The header wins when both are set.
fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Ok(token.to_string());
            }
        }
    }

    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Ok(cookie.value().to_string());
        }
    }

    Err(AuthError::MissingToken)
}

/// Full authentication pipeline: token extraction, signature and expiry
/// verification, principal lookup, and the stale-token check. Returns the
/// live user row so callers can decide what to keep.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AuthError> {
    let token = extract_token(headers)?;
    let claims = state.tokens.verify(&token)?;

    let user = User::find_active_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AuthError::PrincipalGone)?;

    if user.password_changed_after(claims.iat) {
        return Err(AuthError::StaleToken);
    }

    Ok(user)
}

/// Middleware guard for protected routes. Rejects the request unless a
/// valid principal can be established, then stashes it in extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(CurrentUser::from(user));
    Ok(next.run(request).await)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, ApiError> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            ApiError::unauthorized("You are not logged in. Please log in to get access")
        })
    }
}

/// Soft authentication for routes that adapt to a logged-in viewer but
/// never reject anonymous traffic. Any authentication failure degrades
/// to `None` instead of an error response.
pub struct OptionalUser(pub Option<CurrentUser>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Infallible> {
        match authenticate(state, &parts.headers).await {
            Ok(user) => Ok(OptionalUser(Some(user.into()))),
            Err(_) => Ok(OptionalUser(None)),
        }
    }
}

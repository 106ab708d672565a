use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::models::Role;

use super::CurrentUser;

/// Role check against an explicit allow-list. Must run after
/// `require_auth`, which puts the principal into request extensions.
pub fn check_role(user: &CurrentUser, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ))
    }
}

/// Middleware form of the role gate, for use with
/// `middleware::from_fn(move |req, next| restrict_to(ALLOWED, req, next))`.
pub async fn restrict_to(
    allowed: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request.extensions().get::<CurrentUser>().ok_or_else(|| {
        ApiError::unauthorized("You are not logged in. Please log in to get access")
    })?;
    check_role(user, allowed)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use uuid::Uuid;

    fn user_with_role(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            photo: "default.jpg".to_string(),
            role,
        }
    }

    #[test]
    fn allows_listed_role() {
        let admin = user_with_role(Role::Admin);
        assert!(check_role(&admin, &[Role::Admin, Role::LeadGuide]).is_ok());
    }

    #[test]
    fn rejects_unlisted_role() {
        let user = user_with_role(Role::User);
        let err = check_role(&user, &[Role::Admin, Role::LeadGuide]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn empty_allow_list_rejects_everyone() {
        let admin = user_with_role(Role::Admin);
        assert!(check_role(&admin, &[]).is_err());
    }
}

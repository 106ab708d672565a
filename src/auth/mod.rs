pub mod claims;
pub mod password;
pub mod reset;

pub use claims::{Claims, TokenKeys};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("You are not logged in; please log in to get access")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("The user belonging to this token no longer exists")]
    PrincipalGone,

    #[error("Credentials were changed recently; please log in again")]
    StaleToken,

    #[error("Incorrect email or password")]
    BadCredentials,

    #[error("Reset token is invalid or has expired")]
    ResetTokenInvalid,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Token signing failed: {0}")]
    TokenCreation(String),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub mod auth;
pub mod roles;

pub use auth::{require_auth, CurrentUser, OptionalUser, SESSION_COOKIE};
pub use roles::restrict_to;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

use super::AuthError;

/// JWT payload: the principal's id plus issue and expiry timestamps. The
/// issue time is what the stale-token check compares against
/// `password_changed_at`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived once from config at startup.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expires_in: Duration,
}

impl TokenKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            expires_in: Duration::hours(config.expires_in_hours),
        }
    }

    pub fn sign(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.sign_at(user_id, Utc::now())
    }

    pub fn sign_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.expires_in).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

use anyhow::Result;
use chrono::{Duration, Utc};
use uuid::Uuid;

use trailhead_api::auth::{reset, AuthError, TokenKeys};
use trailhead_api::config::JwtConfig;

fn keys(secret: &str) -> TokenKeys {
    TokenKeys::new(&JwtConfig {
        secret: secret.to_string(),
        expires_in_hours: 24,
        cookie_expires_days: 7,
    })
}

#[test]
fn issued_token_verifies_and_carries_the_subject() -> Result<()> {
    let keys = keys("integration-secret");
    let user_id = Uuid::new_v4();

    let token = keys.sign(user_id)?;
    let claims = keys.verify(&token)?;

    assert_eq!(claims.sub, user_id);
    assert!(claims.exp > claims.iat);
    Ok(())
}

#[test]
fn token_signed_with_another_secret_is_rejected() -> Result<()> {
    let token = keys("secret-a").sign(Uuid::new_v4())?;
    let result = keys("secret-b").verify(&token);

    assert!(matches!(result, Err(AuthError::InvalidToken)));
    Ok(())
}

#[test]
fn expired_token_is_rejected() -> Result<()> {
    let keys = keys("integration-secret");
    // Issued two days ago with a 24h lifetime
    let token = keys.sign_at(Uuid::new_v4(), Utc::now() - Duration::hours(48))?;

    assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    Ok(())
}

#[test]
fn tampered_token_is_rejected() -> Result<()> {
    let keys = keys("integration-secret");
    let mut token = keys.sign(Uuid::new_v4())?;
    token.push('x');

    assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    Ok(())
}

#[test]
fn reset_token_redeems_once_then_never_again() {
    let token = reset::generate();
    let now = Utc::now();

    // First presentation matches the stored digest
    assert!(reset::redeemable(
        Some(token.hash.as_str()),
        Some(token.expires_at),
        &token.raw,
        now,
    ));

    // Redemption clears the stored digest; the same raw token is now dead
    assert!(!reset::redeemable(None, None, &token.raw, now));
}

#[test]
fn expired_reset_token_is_dead() {
    let token = reset::generate();
    let after_expiry = token.expires_at + Duration::seconds(1);

    assert!(!reset::redeemable(
        Some(token.hash.as_str()),
        Some(token.expires_at),
        &token.raw,
        after_expiry,
    ));
}

#[test]
fn wrong_reset_token_never_matches() {
    let stored = reset::generate();
    let presented = reset::generate();

    assert!(!reset::redeemable(
        Some(stored.hash.as_str()),
        Some(stored.expires_at),
        &presented.raw,
        Utc::now(),
    ));
}

#[test]
fn raw_reset_token_differs_from_stored_digest() {
    let token = reset::generate();
    // Only the digest is persisted; it must not reveal the mailed token
    assert_ne!(token.raw, token.hash);
    assert_eq!(reset::hash_token(&token.raw), token.hash);
}

// Password reset tokens: the raw token goes out by email, only its SHA-256
// digest and a short expiry are stored. Redemption is single-use because the
// stored digest is cleared as part of the credential change.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const TOKEN_BYTES: usize = 32;
const TOKEN_TTL_MINUTES: i64 = 10;

#[derive(Debug)]
pub struct ResetToken {
    /// Hex-encoded random token, emailed to the user and never stored.
    pub raw: String,
    /// SHA-256 hex digest, the only form persisted.
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

pub fn generate() -> ResetToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let raw = hex::encode(bytes);
    let hash = hash_token(&raw);
    ResetToken {
        raw,
        hash,
        expires_at: Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES),
    }
}

pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether a presented raw token redeems against the stored digest/expiry.
/// Digest comparison is constant-time. A cleared digest (already redeemed or
/// never issued) can never match again.
pub fn redeemable(
    stored_hash: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    presented: &str,
    now: DateTime<Utc>,
) -> bool {
    let (stored, expires) = match (stored_hash, expires_at) {
        (Some(s), Some(e)) => (s, e),
        _ => return false,
    };
    if now >= expires {
        return false;
    }
    let presented_hash = hash_token(presented);
    bool::from(presented_hash.as_bytes().ct_eq(stored.as_bytes()))
}

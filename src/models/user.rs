use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Fixed role enumeration backed by the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "user_role", rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

/// Principal record. Credential and reset fields never serialize into
/// responses; soft-deleted rows (`active = false`) are excluded from every
/// default read, including the auth chain's principal load.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Columns that client-supplied filter, sort, and projection keys may
    /// name. Credential, reset, and soft-delete columns stay out so they can
    /// never be filtered on or projected, even by admins.
    pub const COLUMNS: &'static [&'static str] =
        &["id", "name", "email", "photo", "role", "created_at"];

    /// Whether the credential changed after a token issued at `iat` (unix
    /// seconds). Tokens issued before a password change are stale.
    pub fn password_changed_after(&self, iat: i64) -> bool {
        match self.password_changed_at {
            Some(changed_at) => changed_at.timestamp() > iat,
            None => false,
        }
    }

    pub async fn insert(
        pool: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .await
    }

    pub async fn find_active_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND active = TRUE")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_active_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND active = TRUE")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Credential change. `password_changed_at` is set one second in the past
    /// so a token issued in the same instant is not itself stale; the stored
    /// reset digest is cleared, making any outstanding reset token dead.
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let changed_at = Utc::now() - Duration::seconds(1);
        sqlx::query_as::<_, User>(
            "UPDATE users SET password_hash = $2, password_changed_at = $3, \
             password_reset_token = NULL, password_reset_expires = NULL \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(password_hash)
        .bind(changed_at)
        .fetch_one(pool)
        .await
    }

    pub async fn store_reset_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET password_reset_token = $2, password_reset_expires = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn clear_reset_token(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET password_reset_token = NULL, password_reset_expires = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Active users holding an unexpired reset digest. The presented token is
    /// matched against these in constant time rather than by SQL equality.
    pub async fn find_reset_candidates(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE active = TRUE \
             AND password_reset_token IS NOT NULL AND password_reset_expires > now()",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        photo: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), \
             photo = COALESCE($4, photo) WHERE id = $1 AND active = TRUE RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(photo)
        .fetch_one(pool)
        .await
    }

    pub async fn update_role(pool: &PgPool, id: Uuid, role: Role) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2 WHERE id = $1 AND active = TRUE RETURNING *",
        )
        .bind(id)
        .bind(role)
        .fetch_one(pool)
        .await
    }

    /// Soft delete: the row stays but disappears from all default reads.
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

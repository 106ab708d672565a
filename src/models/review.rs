use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub body: String,
    pub rating: f64,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewReview {
    pub body: String,
    pub rating: f64,
    pub tour_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewUpdate {
    pub body: Option<String>,
    pub rating: Option<f64>,
}

impl Review {
    /// Columns that client-supplied filter, sort, and projection keys may name.
    pub const COLUMNS: &'static [&'static str] =
        &["id", "body", "rating", "tour_id", "user_id", "created_at"];

    pub async fn insert(
        pool: &PgPool,
        body: &str,
        rating: f64,
        tour_id: Uuid,
        user_id: Uuid,
    ) -> Result<Review, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (body, rating, tour_id, user_id) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(body)
        .bind(rating)
        .bind(tour_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: &ReviewUpdate,
    ) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            "UPDATE reviews SET body = COALESCE($2, body), rating = COALESCE($3, rating) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(patch.body.as_deref())
        .bind(patch.rating)
        .fetch_optional(pool)
        .await
    }

    /// Best-effort rating aggregate. Runs as a follow-up write after each
    /// review save/update/delete; no transaction ties the two writes, so a
    /// crash in between leaves the aggregate stale until the next write.
    /// Failures are logged, not propagated.
    pub async fn recalc_tour_ratings(pool: &PgPool, tour_id: Uuid) {
        if let Err(e) = Self::try_recalc_tour_ratings(pool, tour_id).await {
            tracing::warn!(%tour_id, "rating aggregate recompute failed: {}", e);
        }
    }

    async fn try_recalc_tour_ratings(pool: &PgPool, tour_id: Uuid) -> Result<(), sqlx::Error> {
        let (quantity, average): (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(rating)::float8 FROM reviews WHERE tour_id = $1",
        )
        .bind(tour_id)
        .fetch_one(pool)
        .await?;

        // No reviews left: fall back to the seed average
        sqlx::query("UPDATE tours SET ratings_quantity = $2, ratings_average = $3 WHERE id = $1")
            .bind(tour_id)
            .bind(quantity)
            .bind(average.unwrap_or(4.5))
            .execute(pool)
            .await?;
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: String,
    pub price: f64,
    pub summary: String,
    pub description: String,
    pub ratings_average: f64,
    pub ratings_quantity: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewTour {
    pub name: String,
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: String,
    pub price: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TourUpdate {
    pub name: Option<String>,
    pub duration: Option<i32>,
    pub max_group_size: Option<i32>,
    pub difficulty: Option<String>,
    pub price: Option<f64>,
    pub summary: Option<String>,
    pub description: Option<String>,
}

impl TourUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.duration.is_none()
            && self.max_group_size.is_none()
            && self.difficulty.is_none()
            && self.price.is_none()
            && self.summary.is_none()
            && self.description.is_none()
    }
}

impl Tour {
    /// Columns that client-supplied filter, sort, and projection keys may name.
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "duration",
        "max_group_size",
        "difficulty",
        "price",
        "summary",
        "description",
        "ratings_average",
        "ratings_quantity",
        "created_at",
    ];

    pub async fn insert(pool: &PgPool, new: &NewTour) -> Result<Tour, sqlx::Error> {
        sqlx::query_as::<_, Tour>(
            "INSERT INTO tours (name, duration, max_group_size, difficulty, price, summary, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(&new.name)
        .bind(new.duration)
        .bind(new.max_group_size)
        .bind(&new.difficulty)
        .bind(new.price)
        .bind(&new.summary)
        .bind(&new.description)
        .fetch_one(pool)
        .await
    }

    /// Partial update; callers must reject an empty patch first.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: &TourUpdate,
    ) -> Result<Option<Tour>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tours SET ");
        let mut sets = qb.separated(", ");
        if let Some(name) = &patch.name {
            sets.push("name = ").push_bind_unseparated(name);
        }
        if let Some(duration) = patch.duration {
            sets.push("duration = ").push_bind_unseparated(duration);
        }
        if let Some(max_group_size) = patch.max_group_size {
            sets.push("max_group_size = ")
                .push_bind_unseparated(max_group_size);
        }
        if let Some(difficulty) = &patch.difficulty {
            sets.push("difficulty = ").push_bind_unseparated(difficulty);
        }
        if let Some(price) = patch.price {
            sets.push("price = ").push_bind_unseparated(price);
        }
        if let Some(summary) = &patch.summary {
            sets.push("summary = ").push_bind_unseparated(summary);
        }
        if let Some(description) = &patch.description {
            sets.push("description = ").push_bind_unseparated(description);
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        qb.build_query_as::<Tour>().fetch_optional(pool).await
    }
}

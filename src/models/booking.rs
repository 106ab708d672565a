use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub price: f64,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewBooking {
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub price: f64,
    #[serde(default = "default_paid")]
    pub paid: bool,
}

fn default_paid() -> bool {
    true
}

impl Booking {
    /// Columns that client-supplied filter, sort, and projection keys may name.
    pub const COLUMNS: &'static [&'static str] =
        &["id", "tour_id", "user_id", "price", "paid", "created_at"];

    pub async fn insert(pool: &PgPool, new: &NewBooking) -> Result<Booking, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (tour_id, user_id, price, paid) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(new.tour_id)
        .bind(new.user_id)
        .bind(new.price)
        .bind(new.paid)
        .fetch_one(pool)
        .await
    }
}

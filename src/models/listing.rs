use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Listing {
    pub listing_id: i64,
    pub driver_username: String,
    pub ride_date: String,
    pub ride_time: String,
    pub price: i64,
}

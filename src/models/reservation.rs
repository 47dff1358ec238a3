use serde::Serialize;
use sqlx::FromRow;

/// A completed reservation. Rows are only ever inserted with
/// status "CONFIRMED"; there is no cancellation path.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reservation {
    pub order_id: i64,
    pub listing_id: i64,
    pub driver_username: String,
    pub rider_username: String,
    pub ride_date: String,
    pub ride_time: String,
    pub price: i64,
    pub status: String,
}

pub const STATUS_CONFIRMED: &str = "CONFIRMED";

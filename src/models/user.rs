use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserRecord {
    pub email_address: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub rating_sum: i64,
    pub rating_count: i64,
    pub driver: i64,
}

impl UserRecord {
    pub async fn find_by_username(
        username: &str,
        db: &crate::database::Database,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT email_address, first_name, last_name, username,
                    rating_sum, rating_count, driver
             FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&db.pool)
        .await
    }

    pub fn is_driver(&self) -> bool {
        self.driver == 1
    }

    // "0.00" instead of dividing by zero for unrated users.
    pub fn average_rating(&self) -> String {
        if self.rating_count == 0 {
            "0.00".to_string()
        } else {
            format!("{:.2}", self.rating_sum as f64 / self.rating_count as f64)
        }
    }
}

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

// One migrator per service database.
pub static USERS_MIGRATOR: Migrator = sqlx::migrate!("./migrations/users");
pub static PAYMENTS_MIGRATOR: Migrator = sqlx::migrate!("./migrations/payments");
pub static AVAILABILITY_MIGRATOR: Migrator = sqlx::migrate!("./migrations/availability");
pub static RESERVATIONS_MIGRATOR: Migrator = sqlx::migrate!("./migrations/reservations");

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Sqlite>,
}

impl Database {
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        Ok(Database { pool })
    }

    // Migrations run eagerly at startup, before the listener binds.
    pub async fn run_migrations(
        &self,
        migrator: &Migrator,
    ) -> Result<(), sqlx::migrate::MigrateError> {
        migrator.run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }
}

pub mod auth;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod services;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use database::{
    Database, AVAILABILITY_MIGRATOR, PAYMENTS_MIGRATOR, RESERVATIONS_MIGRATOR, USERS_MIGRATOR,
};
use services::clients::ServiceClients;

// Shared state for all four services. Each service owns its own database;
// the capability clients are the only path between them.
pub struct AppState {
    pub users_db: Database,
    pub payments_db: Database,
    pub availability_db: Database,
    pub reservations_db: Database,
    pub clients: ServiceClients,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let pool_size = config.databases.pool_size;
        let users_db = Database::new(&config.databases.users_url, pool_size).await?;
        let payments_db = Database::new(&config.databases.payments_url, pool_size).await?;
        let availability_db = Database::new(&config.databases.availability_url, pool_size).await?;
        let reservations_db = Database::new(&config.databases.reservations_url, pool_size).await?;

        // Eager schema init, before any traffic is accepted.
        users_db.run_migrations(&USERS_MIGRATOR).await?;
        payments_db.run_migrations(&PAYMENTS_MIGRATOR).await?;
        availability_db.run_migrations(&AVAILABILITY_MIGRATOR).await?;
        reservations_db.run_migrations(&RESERVATIONS_MIGRATOR).await?;

        let clients = ServiceClients::from_config(&config.services, &config.http);

        Ok(Arc::new(Self {
            users_db,
            payments_db,
            availability_db,
            reservations_db,
            clients,
            config,
        }))
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ridedemand API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

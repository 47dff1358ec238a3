pub mod availability;
pub mod payments;
pub mod reservations;
pub mod users;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .nest("/users", users::routes())
        .nest("/payments", payments::routes())
        .nest("/availability", availability::routes())
        .nest("/reservations", reservations::routes())
}

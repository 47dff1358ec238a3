use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services::clients::{Role, SharedReservationResponse};
use crate::services::saga;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reserve", post(reserve))
        .route("/view", get(view))
        .route("/check_reservation", get(check_reservation))
        .route("/reset", post(reset))
}

// POST /api/reservations/reserve
#[derive(Debug, Deserialize)]
struct ReserveRequest {
    listing_id: i64,
}

async fn reserve(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ReserveRequest>,
) -> ApiResult<impl IntoResponse> {
    let reservation = saga::reserve(&state, &user.username, req.listing_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"status": "SUCCESS", "reservation": reservation})),
    ))
}

// GET /api/reservations/view
//
// The caller's single most recent reservation, with the counterparty's
// aggregate rating. Drivers see their latest rider and vice versa.
async fn view(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let role = state
        .clients
        .resolve_role(&user.username)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let row: Option<(i64, i64, String)> = match role {
        Role::Driver => {
            sqlx::query_as(
                "SELECT listing_id, price, rider_username FROM reservations
                 WHERE driver_username = ? ORDER BY order_id DESC LIMIT 1",
            )
            .bind(&user.username)
            .fetch_optional(&state.reservations_db.pool)
            .await?
        }
        Role::Rider => {
            sqlx::query_as(
                "SELECT listing_id, price, driver_username FROM reservations
                 WHERE rider_username = ? ORDER BY order_id DESC LIMIT 1",
            )
            .bind(&user.username)
            .fetch_optional(&state.reservations_db.pool)
            .await?
        }
    };

    let (listing_id, price_cents, counterparty) = row.ok_or(ApiError::NotFound("reservation"))?;

    let rating = state
        .clients
        .resolve_rating(&counterparty)
        .await?
        .unwrap_or_else(|| "0.00".to_string());

    Ok(Json(json!({
        "status": "SUCCESS",
        "data": {
            "listing_id": listing_id,
            "price_cents": price_cents,
            "price": format!("{:.2}", price_cents as f64 / 100.0),
            "user": counterparty,
            "rating": rating,
        }
    })))
}

// GET /api/reservations/check_reservation (internal)
#[derive(Debug, Deserialize)]
struct CheckReservationQuery {
    username1: String,
    username2: String,
}

async fn check_reservation(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckReservationQuery>,
) -> ApiResult<impl IntoResponse> {
    // Symmetric: either user may have been the driver.
    let shared = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM reservations
            WHERE (driver_username = ?1 AND rider_username = ?2)
               OR (driver_username = ?2 AND rider_username = ?1)
         )",
    )
    .bind(&params.username1)
    .bind(&params.username2)
    .fetch_one(&state.reservations_db.pool)
    .await?;

    Ok(Json(SharedReservationResponse { shared }))
}

// POST /api/reservations/reset
async fn reset(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let result = sqlx::query("DELETE FROM reservations")
        .execute(&state.reservations_db.pool)
        .await?;

    tracing::warn!(
        "reservation service reset, {} reservations deleted",
        result.rows_affected()
    );
    Ok(Json(json!({"status": "SUCCESS", "reservations_deleted": result.rows_affected()})))
}

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services::clients::{InitBalanceRequest, TransferRequest, TransferResponse, TransferStatus};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/init_balance", post(init_balance))
        .route("/add", post(add_funds))
        .route("/view", get(view_balance))
        .route("/transfer", post(transfer))
        .route("/reset", post(reset))
}

// POST /api/payments/init_balance (internal)
async fn init_balance(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InitBalanceRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.amount_cents < 0 {
        return Err(ApiError::InvalidInput(
            "amount_cents must not be negative".to_string(),
        ));
    }

    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM balances WHERE username = ?)")
            .bind(&req.username)
            .fetch_one(&state.payments_db.pool)
            .await?;
    if exists {
        return Err(ApiError::Conflict("balance already initialized"));
    }

    sqlx::query("INSERT INTO balances (username, balance) VALUES (?, ?)")
        .bind(&req.username)
        .bind(req.amount_cents)
        .execute(&state.payments_db.pool)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({"status": "SUCCESS"}))))
}

// POST /api/payments/add
#[derive(Debug, Deserialize)]
struct AddFundsRequest {
    amount_cents: i64,
}

async fn add_funds(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<AddFundsRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.amount_cents <= 0 {
        return Err(ApiError::InvalidInput("amount_cents must be positive".to_string()));
    }

    let result = sqlx::query("UPDATE balances SET balance = balance + ? WHERE username = ?")
        .bind(req.amount_cents)
        .bind(&user.username)
        .execute(&state.payments_db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("balance"));
    }

    Ok(Json(json!({"status": "SUCCESS"})))
}

// GET /api/payments/view
async fn view_balance(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let balance: Option<i64> = sqlx::query_scalar("SELECT balance FROM balances WHERE username = ?")
        .bind(&user.username)
        .fetch_optional(&state.payments_db.pool)
        .await?;
    let balance = balance.ok_or(ApiError::NotFound("balance"))?;

    Ok(Json(json!({
        "status": "SUCCESS",
        "balance_cents": balance,
        "balance": format!("{:.2}", balance as f64 / 100.0),
    })))
}

// POST /api/payments/transfer (internal)
//
// Debit and credit happen in one transaction, with the debit conditional on
// the rider actually holding the funds, so a concurrent transfer on the
// same rider cannot overdraw the balance. Business failures are reported in
// the response status rather than as HTTP errors so callers can tell them
// apart from transport failures.
async fn transfer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.price_cents < 0 {
        return Err(ApiError::InvalidInput("price_cents must not be negative".to_string()));
    }

    let mut tx = state.payments_db.pool.begin().await?;

    let debited = sqlx::query(
        "UPDATE balances SET balance = balance - ?1 WHERE username = ?2 AND balance >= ?1",
    )
    .bind(req.price_cents)
    .bind(&req.rider_username)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if debited == 0 {
        let rider_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM balances WHERE username = ?)")
                .bind(&req.rider_username)
                .fetch_one(&mut *tx)
                .await?;
        tx.rollback().await?;
        let status = if rider_exists {
            TransferStatus::InsufficientFunds
        } else {
            TransferStatus::UnknownUser
        };
        return Ok(Json(TransferResponse { status }));
    }

    let credited = sqlx::query("UPDATE balances SET balance = balance + ? WHERE username = ?")
        .bind(req.price_cents)
        .bind(&req.driver_username)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if credited == 0 {
        tx.rollback().await?;
        return Ok(Json(TransferResponse {
            status: TransferStatus::UnknownUser,
        }));
    }

    tx.commit().await?;

    tracing::info!(
        rider = %req.rider_username,
        driver = %req.driver_username,
        price_cents = req.price_cents,
        "transfer completed",
    );
    Ok(Json(TransferResponse {
        status: TransferStatus::Ok,
    }))
}

// POST /api/payments/reset
async fn reset(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let result = sqlx::query("DELETE FROM balances")
        .execute(&state.payments_db.pool)
        .await?;

    tracing::warn!("payments service reset, {} balances deleted", result.rows_affected());
    Ok(Json(json!({"status": "SUCCESS", "balances_deleted": result.rows_affected()})))
}

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::auth::{self, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::models::UserRecord;
use crate::services::clients::{RatingResponse, Role, RoleResponse};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create_user", post(create_user))
        .route("/login", post(login))
        .route("/rate", post(rate))
        .route("/get_driver_status", get(get_driver_status))
        .route("/get_average_rating", get(get_average_rating))
        .route("/set_driver_status", post(set_driver_status))
        .route("/update", post(update_account))
        .route("/view", get(view_account))
        .route("/reset", post(reset))
}

/* ---------- helpers ---------- */

async fn username_taken(pool: &sqlx::SqlitePool, username: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
        .bind(username)
        .fetch_one(pool)
        .await
}

async fn email_taken(pool: &sqlx::SqlitePool, email: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email_address = ?)")
        .bind(email)
        .fetch_one(pool)
        .await
}

/// Password policy: at least 8 characters, mixed case plus a digit, and it
/// must not contain the username or either name (case-insensitive).
fn validate_password(
    username: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("password must be at least 8 characters");
    }
    let lower = password.chars().any(|c| c.is_lowercase());
    let upper = password.chars().any(|c| c.is_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if !(lower && upper && digit) {
        return Err("password must contain an uppercase letter, a lowercase letter and a digit");
    }
    let haystack = password.to_lowercase();
    for part in [username, first_name, last_name] {
        if part.is_empty() || haystack.contains(&part.to_lowercase()) {
            return Err("password must not contain your username or name");
        }
    }
    Ok(())
}

/// Check `password` against the user's current hash.
async fn password_correct(
    pool: &sqlx::SqlitePool,
    username: &str,
    password: &str,
) -> ApiResult<bool> {
    let hash: Option<String> = sqlx::query_scalar(
        "SELECT p.password_hash
         FROM passwords p
         JOIN users u ON u.email_address = p.email_address
         WHERE u.username = ? AND p.is_current = 1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    match hash {
        Some(hash) => Ok(bcrypt::verify(password, &hash).unwrap_or(false)),
        None => Ok(false),
    }
}

/// Has the user ever used this password before, current one included?
async fn password_reused(
    pool: &sqlx::SqlitePool,
    email_address: &str,
    password: &str,
) -> ApiResult<bool> {
    let hashes: Vec<String> =
        sqlx::query_scalar("SELECT password_hash FROM passwords WHERE email_address = ?")
            .bind(email_address)
            .fetch_all(pool)
            .await?;

    Ok(hashes
        .iter()
        .any(|hash| bcrypt::verify(password, hash).unwrap_or(false)))
}

/* ---------- account lifecycle ---------- */

// POST /api/users/create_user
#[derive(Debug, Deserialize, Validate)]
struct CreateUserRequest {
    first_name: String,
    last_name: String,
    username: String,
    #[validate(email)]
    email_address: String,
    driver: bool,
    deposit_cents: i64,
    password: String,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()
        .map_err(|_| ApiError::InvalidInput("email address is not valid".to_string()))?;
    if req.deposit_cents < 0 {
        return Err(ApiError::InvalidInput(
            "deposit_cents must not be negative".to_string(),
        ));
    }

    if username_taken(&state.users_db.pool, &req.username).await? {
        return Err(ApiError::Conflict("username is already taken"));
    }
    if email_taken(&state.users_db.pool, &req.email_address).await? {
        return Err(ApiError::Conflict("email address is already registered"));
    }
    validate_password(&req.username, &req.password, &req.first_name, &req.last_name)
        .map_err(|reason| ApiError::InvalidInput(reason.to_string()))?;

    let password_hash =
        bcrypt::hash(&req.password, bcrypt::DEFAULT_COST).map_err(|_| ApiError::Internal)?;

    let mut tx = state.users_db.pool.begin().await?;
    sqlx::query(
        "INSERT INTO users (email_address, first_name, last_name, username, driver)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&req.email_address)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.username)
    .bind(if req.driver { 1_i64 } else { 0_i64 })
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "INSERT INTO passwords (email_address, password_hash, is_current) VALUES (?, ?, 1)",
    )
    .bind(&req.email_address)
    .bind(&password_hash)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    // Seed the wallet. Signup already committed, so a payments failure is
    // logged instead of rolling the account back.
    if let Err(e) = state
        .clients
        .init_balance(&req.username, req.deposit_cents)
        .await
    {
        tracing::warn!(
            username = %req.username,
            deposit_cents = req.deposit_cents,
            "failed to initialize balance for new user: {e}",
        );
    }

    tracing::info!(username = %req.username, driver = req.driver, "user created");
    Ok((StatusCode::CREATED, Json(json!({"status": "SUCCESS"}))))
}

// POST /api/users/login
#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if !password_correct(&state.users_db.pool, &req.username, &req.password).await? {
        return Err(ApiError::Unauthorized);
    }

    let token = auth::issue_token(
        &req.username,
        &state.config.jwt.secret,
        state.config.jwt.expires_in_hours,
    )?;

    Ok(Json(json!({"status": "SUCCESS", "token": token})))
}

// POST /api/users/update
//
// Change either the username or the password, never both in one call.
#[derive(Debug, Deserialize)]
struct UpdateAccountRequest {
    new_username: Option<String>,
    password: Option<String>,
    new_password: Option<String>,
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(new_username) = req.new_username {
        if new_username.is_empty() {
            return Err(ApiError::InvalidInput("new_username must not be empty".to_string()));
        }
        if username_taken(&state.users_db.pool, &new_username).await? {
            return Err(ApiError::Conflict("username is already taken"));
        }
        sqlx::query("UPDATE users SET username = ? WHERE username = ?")
            .bind(&new_username)
            .bind(&user.username)
            .execute(&state.users_db.pool)
            .await?;
        return Ok(Json(json!({"status": "SUCCESS"})));
    }

    if let Some(new_password) = req.new_password {
        let current = req.password.unwrap_or_default();
        if !password_correct(&state.users_db.pool, &user.username, &current).await? {
            return Err(ApiError::Unauthorized);
        }
        let record = UserRecord::find_by_username(&user.username, &state.users_db)
            .await?
            .ok_or(ApiError::NotFound("user"))?;
        if password_reused(&state.users_db.pool, &record.email_address, &new_password).await? {
            return Err(ApiError::Conflict("password has already been used"));
        }
        validate_password(
            &user.username,
            &new_password,
            &record.first_name,
            &record.last_name,
        )
        .map_err(|reason| ApiError::InvalidInput(reason.to_string()))?;

        let new_hash =
            bcrypt::hash(&new_password, bcrypt::DEFAULT_COST).map_err(|_| ApiError::Internal)?;

        // Retire the old password, keep it in the history table.
        let mut tx = state.users_db.pool.begin().await?;
        sqlx::query("UPDATE passwords SET is_current = 0 WHERE email_address = ?")
            .bind(&record.email_address)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO passwords (email_address, password_hash, is_current) VALUES (?, ?, 1)",
        )
        .bind(&record.email_address)
        .bind(&new_hash)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        return Ok(Json(json!({"status": "SUCCESS"})));
    }

    Err(ApiError::InvalidInput(
        "provide new_username or new_password".to_string(),
    ))
}

// GET /api/users/view
async fn view_account(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let record = UserRecord::find_by_username(&user.username, &state.users_db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(json!({
        "status": "SUCCESS",
        "data": {
            "username": record.username,
            "email_address": record.email_address,
            "first_name": record.first_name,
            "last_name": record.last_name,
        }
    })))
}

/* ---------- roles & ratings ---------- */

// POST /api/users/set_driver_status
#[derive(Debug, Deserialize)]
struct SetDriverStatusRequest {
    username: String,
    driver: bool,
}

async fn set_driver_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<SetDriverStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    // The token must have been issued for the account being changed.
    if user.username != req.username {
        return Err(ApiError::Unauthorized);
    }

    let result = sqlx::query("UPDATE users SET driver = ? WHERE username = ?")
        .bind(if req.driver { 1_i64 } else { 0_i64 })
        .bind(&req.username)
        .execute(&state.users_db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("user"));
    }

    Ok(Json(json!({"status": "SUCCESS"})))
}

// POST /api/users/rate
#[derive(Debug, Deserialize)]
struct RateRequest {
    username: String,
    rating: i64,
}

async fn rate(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<RateRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.username.is_empty() || req.username == user.username {
        return Err(ApiError::InvalidInput("cannot rate yourself".to_string()));
    }
    if !(0..=5).contains(&req.rating) {
        return Err(ApiError::InvalidInput("rating must be between 0 and 5".to_string()));
    }

    // Only users who actually shared a ride may rate each other.
    let shared = state
        .clients
        .check_reservation(&user.username, &req.username)
        .await?;
    if !shared {
        return Err(ApiError::InvalidInput(
            "no shared reservation with this user".to_string(),
        ));
    }

    let result = sqlx::query(
        "UPDATE users SET rating_sum = rating_sum + ?, rating_count = rating_count + 1
         WHERE username = ?",
    )
    .bind(req.rating)
    .bind(&req.username)
    .execute(&state.users_db.pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("user"));
    }

    Ok(Json(json!({"status": "SUCCESS"})))
}

// GET /api/users/get_driver_status (internal)
#[derive(Debug, Deserialize)]
struct UsernameQuery {
    username: String,
}

async fn get_driver_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UsernameQuery>,
) -> ApiResult<impl IntoResponse> {
    let record = UserRecord::find_by_username(&params.username, &state.users_db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let role = if record.is_driver() { Role::Driver } else { Role::Rider };
    Ok(Json(RoleResponse { role }))
}

// GET /api/users/get_average_rating (internal)
async fn get_average_rating(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UsernameQuery>,
) -> ApiResult<impl IntoResponse> {
    let record = UserRecord::find_by_username(&params.username, &state.users_db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(RatingResponse {
        average_rating: Some(record.average_rating()),
    }))
}

/* ---------- test support ---------- */

// POST /api/users/reset
async fn reset(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let mut tx = state.users_db.pool.begin().await?;
    sqlx::query("DELETE FROM passwords").execute(&mut *tx).await?;
    let users = sqlx::query("DELETE FROM users").execute(&mut *tx).await?;
    tx.commit().await?;

    tracing::warn!("user service reset, {} users deleted", users.rows_affected());
    Ok(Json(json!({"status": "SUCCESS", "users_deleted": users.rows_affected()})))
}

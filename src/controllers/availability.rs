use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::Listing;
use crate::services::clients::{ListingDetails, RemoveListingRequest, RemoveListingResponse, Role};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/listing", post(create_listing))
        .route("/search", get(search))
        .route("/get_driver_price", get(get_driver_price))
        .route("/remove_availability", post(remove_availability))
        .route("/reset", post(reset))
}

fn validate_ride_date(date: &str) -> Result<(), ApiError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ApiError::InvalidInput("ride_date must be YYYY-MM-DD".to_string()))
}

fn validate_ride_time(time: &str) -> Result<(), ApiError> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .map(|_| ())
        .map_err(|_| ApiError::InvalidInput("ride_time must be HH:MM".to_string()))
}

// POST /api/availability/listing
#[derive(Debug, Deserialize)]
struct CreateListingRequest {
    listing_id: i64,
    ride_date: String,
    ride_time: String,
    price_cents: i64,
}

async fn create_listing(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateListingRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_ride_date(&req.ride_date)?;
    validate_ride_time(&req.ride_time)?;
    if req.price_cents <= 0 {
        return Err(ApiError::InvalidInput("price_cents must be positive".to_string()));
    }

    // Only drivers publish listings.
    let role = state.clients.resolve_role(&user.username).await?;
    if role != Some(Role::Driver) {
        return Err(ApiError::RoleViolation);
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM listings WHERE listing_id = ?)",
    )
    .bind(req.listing_id)
    .fetch_one(&state.availability_db.pool)
    .await?;
    if exists {
        return Err(ApiError::Conflict("listing_id already exists"));
    }

    sqlx::query(
        "INSERT INTO listings (listing_id, driver_username, ride_date, ride_time, price)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(req.listing_id)
    .bind(&user.username)
    .bind(&req.ride_date)
    .bind(&req.ride_time)
    .bind(req.price_cents)
    .execute(&state.availability_db.pool)
    .await?;

    tracing::info!(
        listing_id = req.listing_id,
        driver = %user.username,
        "listing created",
    );
    Ok((StatusCode::CREATED, Json(json!({"status": "SUCCESS"}))))
}

// GET /api/availability/search
#[derive(Debug, Deserialize)]
struct SearchQuery {
    ride_date: String,
    ride_time: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchResult {
    listing_id: i64,
    price_cents: i64,
    price: String,
    driver: String,
    rating: String,
}

async fn search(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    validate_ride_date(&params.ride_date)?;

    // Searching is a rider operation.
    let role = state.clients.resolve_role(&user.username).await?;
    if role != Some(Role::Rider) {
        return Err(ApiError::RoleViolation);
    }

    let listings: Vec<Listing> = if let Some(ride_time) = &params.ride_time {
        validate_ride_time(ride_time)?;
        sqlx::query_as(
            "SELECT listing_id, driver_username, ride_date, ride_time, price
             FROM listings WHERE ride_date = ? AND ride_time = ?",
        )
        .bind(&params.ride_date)
        .bind(ride_time)
        .fetch_all(&state.availability_db.pool)
        .await?
    } else {
        sqlx::query_as(
            "SELECT listing_id, driver_username, ride_date, ride_time, price
             FROM listings WHERE ride_date = ?",
        )
        .bind(&params.ride_date)
        .fetch_all(&state.availability_db.pool)
        .await?
    };

    // Decorate each hit with the driver's aggregate rating.
    let mut results = Vec::with_capacity(listings.len());
    for listing in listings {
        let rating = state
            .clients
            .resolve_rating(&listing.driver_username)
            .await?
            .unwrap_or_else(|| "0.00".to_string());
        results.push(SearchResult {
            listing_id: listing.listing_id,
            price_cents: listing.price,
            price: format!("{:.2}", listing.price as f64 / 100.0),
            driver: listing.driver_username,
            rating,
        });
    }

    Ok(Json(json!({"status": "SUCCESS", "data": results})))
}

// GET /api/availability/get_driver_price (internal)
#[derive(Debug, Deserialize)]
struct ListingQuery {
    listing_id: i64,
}

async fn get_driver_price(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListingQuery>,
) -> ApiResult<impl IntoResponse> {
    let listing: Option<Listing> = sqlx::query_as(
        "SELECT listing_id, driver_username, ride_date, ride_time, price
         FROM listings WHERE listing_id = ?",
    )
    .bind(params.listing_id)
    .fetch_optional(&state.availability_db.pool)
    .await?;
    let listing = listing.ok_or(ApiError::ListingUnavailable)?;

    Ok(Json(ListingDetails {
        listing_id: listing.listing_id,
        driver_username: listing.driver_username,
        ride_date: listing.ride_date,
        ride_time: listing.ride_time,
        price_cents: listing.price,
    }))
}

// POST /api/availability/remove_availability (internal)
//
// Atomic conditional delete: the response says whether this call deleted
// the row. A second caller racing for the same listing sees removed=false
// and knows the listing was already consumed.
async fn remove_availability(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RemoveListingRequest>,
) -> ApiResult<impl IntoResponse> {
    let result = sqlx::query("DELETE FROM listings WHERE listing_id = ?")
        .bind(req.listing_id)
        .execute(&state.availability_db.pool)
        .await?;

    Ok(Json(RemoveListingResponse {
        removed: result.rows_affected() > 0,
    }))
}

// POST /api/availability/reset
async fn reset(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let result = sqlx::query("DELETE FROM listings")
        .execute(&state.availability_db.pool)
        .await?;

    tracing::warn!("availability service reset, {} listings deleted", result.rows_affected());
    Ok(Json(json!({"status": "SUCCESS", "listings_deleted": result.rows_affected()})))
}

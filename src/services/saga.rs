//! Reservation saga orchestrator.
//!
//! A reservation is a fixed sequence of blocking calls against the other
//! three services with no shared transaction:
//!
//! 1. role check (identity)       - reversible, nothing mutated yet
//! 2. listing lookup (availability) - reversible
//! 3. fund transfer (payments)    - irreversible once committed
//! 4. listing removal (availability) - irreversible, conditional delete
//! 5. local reservation insert
//!
//! Money moves only after role and listing existence are confirmed, and the
//! listing is freed only after money has moved. Losing the conditional
//! delete in step 4 means a concurrent reservation won the listing; the
//! transfer is then compensated with a reverse transfer so at most one
//! caller keeps both the listing and the debit. A failure after the
//! transfer that cannot be compensated is logged for manual reconciliation
//! and surfaced as INTERNAL_ERROR.

use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::models::reservation::{Reservation, STATUS_CONFIRMED};
use crate::services::clients::{Role, TransferStatus};
use crate::AppState;

pub async fn reserve(
    state: &AppState,
    rider_username: &str,
    listing_id: i64,
) -> ApiResult<Reservation> {
    // 1. Caller must be a rider. Unknown users fail the role check too.
    let role = state.clients.resolve_role(rider_username).await?;
    if role != Some(Role::Rider) {
        return Err(ApiError::RoleViolation);
    }

    // 2. Listing lookup. Short-circuits before any money moves.
    let listing = state
        .clients
        .lookup_listing(listing_id)
        .await?
        .ok_or(ApiError::ListingUnavailable)?;

    // 3. Transfer funds from rider to driver. The listing has not been
    // touched yet, so a business failure here needs no compensation.
    let transfer = state
        .clients
        .transfer(rider_username, &listing.driver_username, listing.price_cents)
        .await?;
    if transfer != TransferStatus::Ok {
        return Err(ApiError::PaymentFailed);
    }

    // 4. Conditional delete of the listing. Zero rows affected means a
    // concurrent reservation consumed it between our lookup and now; give
    // the rider their money back and report the listing gone.
    let removed = match state.clients.remove_listing(listing_id).await {
        Ok(removed) => removed,
        Err(e) => {
            error!(
                listing_id,
                rider = rider_username,
                driver = %listing.driver_username,
                price_cents = listing.price_cents,
                "listing removal failed after funds moved; manual reconciliation required: {e}",
            );
            return Err(ApiError::Downstream(e));
        }
    };
    if !removed {
        return Err(compensate_transfer(state, rider_username, &listing).await);
    }

    // 5. Persist the reservation record. At this point funds have moved and
    // the listing is gone, so a failure here leaves an unrecoverable gap
    // that can only be reconciled by hand.
    let order_id: i64 = sqlx::query_scalar(
        "INSERT INTO reservations
            (listing_id, driver_username, rider_username,
             ride_date, ride_time, price, status)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING order_id",
    )
    .bind(listing_id)
    .bind(&listing.driver_username)
    .bind(rider_username)
    .bind(&listing.ride_date)
    .bind(&listing.ride_time)
    .bind(listing.price_cents)
    .bind(STATUS_CONFIRMED)
    .fetch_one(&state.reservations_db.pool)
    .await
    .map_err(|e| {
        error!(
            listing_id,
            rider = rider_username,
            driver = %listing.driver_username,
            price_cents = listing.price_cents,
            "reservation insert failed after funds moved and listing removed; \
             manual reconciliation required: {e:?}",
        );
        ApiError::Database(e)
    })?;

    info!(
        order_id,
        listing_id,
        rider = rider_username,
        driver = %listing.driver_username,
        "reservation confirmed",
    );

    Ok(Reservation {
        order_id,
        listing_id,
        driver_username: listing.driver_username,
        rider_username: rider_username.to_string(),
        ride_date: listing.ride_date,
        ride_time: listing.ride_time,
        price: listing.price_cents,
        status: STATUS_CONFIRMED.to_string(),
    })
}

// Reverse transfer after losing the listing to a concurrent reservation.
async fn compensate_transfer(
    state: &AppState,
    rider_username: &str,
    listing: &crate::services::clients::ListingDetails,
) -> ApiError {
    match state
        .clients
        .transfer(&listing.driver_username, rider_username, listing.price_cents)
        .await
    {
        Ok(TransferStatus::Ok) => {
            info!(
                listing_id = listing.listing_id,
                rider = rider_username,
                "listing already reserved; transfer compensated",
            );
            ApiError::ListingUnavailable
        }
        Ok(status) => {
            error!(
                listing_id = listing.listing_id,
                rider = rider_username,
                driver = %listing.driver_username,
                price_cents = listing.price_cents,
                ?status,
                "compensating transfer rejected; manual reconciliation required",
            );
            ApiError::Internal
        }
        Err(e) => {
            error!(
                listing_id = listing.listing_id,
                rider = rider_username,
                driver = %listing.driver_username,
                price_cents = listing.price_cents,
                "compensating transfer failed; manual reconciliation required: {e}",
            );
            ApiError::Internal
        }
    }
}

//! Capability clients for service-to-service calls.
//!
//! Every cross-service interaction in the system goes through one of the
//! methods below: identity lookups, availability lookup/removal, fund
//! transfers and the shared-reservation check. Endpoints are configurable
//! per service and every request carries a bounded timeout, so a hung
//! downstream surfaces as an error instead of blocking the caller forever.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{HttpClientConfig, ServiceUrls};

// --- Wire types shared between the clients and the serving controllers ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Driver,
    Rider,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatingResponse {
    pub average_rating: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDetails {
    pub listing_id: i64,
    pub driver_username: String,
    pub ride_date: String,
    pub ride_time: String,
    pub price_cents: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveListingRequest {
    pub listing_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveListingResponse {
    pub removed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Ok,
    InsufficientFunds,
    UnknownUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub rider_username: String,
    pub driver_username: String,
    pub price_cents: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub status: TransferStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitBalanceRequest {
    pub username: String,
    pub amount_cents: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SharedReservationResponse {
    pub shared: bool,
}

/// HTTP clients for the capabilities consumed across service boundaries.
#[derive(Clone)]
pub struct ServiceClients {
    http: reqwest::Client,
    users_url: String,
    payments_url: String,
    availability_url: String,
    reservations_url: String,
}

impl ServiceClients {
    pub fn from_config(services: &ServiceUrls, http: &HttpClientConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(http.timeout_seconds))
                .build()
                .expect("Failed to create HTTP client"),
            users_url: services.users_url.trim_end_matches('/').to_string(),
            payments_url: services.payments_url.trim_end_matches('/').to_string(),
            availability_url: services.availability_url.trim_end_matches('/').to_string(),
            reservations_url: services.reservations_url.trim_end_matches('/').to_string(),
        }
    }

    /// Identity: resolve role. `None` for unknown users.
    pub async fn resolve_role(&self, username: &str) -> Result<Option<Role>, reqwest::Error> {
        let resp = self
            .http
            .get(format!("{}/api/users/get_driver_status", self.users_url))
            .query(&[("username", username)])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.error_for_status()?.json::<RoleResponse>().await?;
        Ok(Some(body.role))
    }

    /// Identity: resolve aggregate rating. `None` for unknown users.
    pub async fn resolve_rating(&self, username: &str) -> Result<Option<String>, reqwest::Error> {
        let resp = self
            .http
            .get(format!("{}/api/users/get_average_rating", self.users_url))
            .query(&[("username", username)])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.error_for_status()?.json::<RatingResponse>().await?;
        Ok(body.average_rating)
    }

    /// Availability: lookup-by-id. `None` when the listing does not exist.
    pub async fn lookup_listing(
        &self,
        listing_id: i64,
    ) -> Result<Option<ListingDetails>, reqwest::Error> {
        let resp = self
            .http
            .get(format!(
                "{}/api/availability/get_driver_price",
                self.availability_url
            ))
            .query(&[("listing_id", listing_id)])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.error_for_status()?.json::<ListingDetails>().await?;
        Ok(Some(body))
    }

    /// Availability: conditional remove-by-id. Returns whether this call
    /// actually deleted the row; `false` means another reservation already
    /// consumed the listing.
    pub async fn remove_listing(&self, listing_id: i64) -> Result<bool, reqwest::Error> {
        let body = self
            .http
            .post(format!(
                "{}/api/availability/remove_availability",
                self.availability_url
            ))
            .json(&RemoveListingRequest { listing_id })
            .send()
            .await?
            .error_for_status()?
            .json::<RemoveListingResponse>()
            .await?;
        Ok(body.removed)
    }

    /// Payments: move `price_cents` from rider to driver. Business failures
    /// come back as a status, not an HTTP error.
    pub async fn transfer(
        &self,
        rider_username: &str,
        driver_username: &str,
        price_cents: i64,
    ) -> Result<TransferStatus, reqwest::Error> {
        let body = self
            .http
            .post(format!("{}/api/payments/transfer", self.payments_url))
            .json(&TransferRequest {
                rider_username: rider_username.to_string(),
                driver_username: driver_username.to_string(),
                price_cents,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<TransferResponse>()
            .await?;
        Ok(body.status)
    }

    /// Payments: seed a new user's balance.
    pub async fn init_balance(
        &self,
        username: &str,
        amount_cents: i64,
    ) -> Result<(), reqwest::Error> {
        self.http
            .post(format!("{}/api/payments/init_balance", self.payments_url))
            .json(&InitBalanceRequest {
                username: username.to_string(),
                amount_cents,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Reservations: do these two users share a reservation, in either
    /// role direction?
    pub async fn check_reservation(
        &self,
        username1: &str,
        username2: &str,
    ) -> Result<bool, reqwest::Error> {
        let body = self
            .http
            .get(format!(
                "{}/api/reservations/check_reservation",
                self.reservations_url
            ))
            .query(&[("username1", username1), ("username2", username2)])
            .send()
            .await?
            .error_for_status()?
            .json::<SharedReservationResponse>()
            .await?;
        Ok(body.shared)
    }
}

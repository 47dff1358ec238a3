use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Issue an HS256 token whose subject is the username. All services share
/// the same signing secret so any of them can validate tokens issued here.
pub fn issue_token(
    username: &str,
    secret: &str,
    expires_in_hours: i64,
) -> Result<String, ApiError> {
    let exp = chrono::Utc::now() + chrono::Duration::hours(expires_in_hours);
    let claims = Claims {
        sub: username.to_string(),
        exp: exp.timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| ApiError::Internal)
}

/// Validate signature and well-formedness, returning the embedded subject.
pub fn token_subject(token: &str, secret: &str) -> Option<String> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .ok()?;
    Some(data.claims.sub)
}

/// Validate the token and require it to have been issued for `expected`.
pub fn token_matches(token: &str, secret: &str, expected: &str) -> bool {
    token_subject(token, secret).as_deref() == Some(expected)
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

// Bearer token extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        // The demo clients historically sent the raw token, so the Bearer
        // prefix is accepted but not required.
        let token = header_value.strip_prefix("Bearer ").unwrap_or(header_value);

        let username =
            token_subject(token, &state.config.jwt.secret).ok_or(ApiError::Unauthorized)?;

        Ok(AuthUser { username })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key";

    #[test]
    fn token_round_trips_the_username() {
        let token = issue_token("alice", SECRET, 1).unwrap();
        assert_eq!(token_subject(&token, SECRET).as_deref(), Some("alice"));
        assert!(token_matches(&token, SECRET, "alice"));
        assert!(!token_matches(&token, SECRET, "bob"));
    }

    #[test]
    fn tampered_signature_fails_validation() {
        let token = issue_token("bob", SECRET, 1).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        parts[2] = "deadbeef";
        let tampered = parts.join(".");
        assert!(token_subject(&tampered, SECRET).is_none());
    }

    #[test]
    fn wrong_secret_fails_validation() {
        let token = issue_token("carol", SECRET, 1).unwrap();
        assert!(token_subject(&token, "other-secret").is_none());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(token_subject("not-a-jwt", SECRET).is_none());
        assert!(token_subject("", SECRET).is_none());
    }
}

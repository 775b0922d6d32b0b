//! Shiprocket shipping aggregator client.
//!
//! Creates carrier orders, assigns AWB codes, requests pickups, fetches
//! tracking timelines, cancels shipments and generates labels through
//! Shiprocket's REST API.
//!
//! # Architecture
//!
//! - Email/password login returns a bearer token valid for about ten days
//! - The token is cached in memory and renewed by logging in again
//! - Every call is a single request; failures are returned to the caller
//!   unchanged and surface as `502 Bad Gateway`
//!
//! The integration is optional. Without `SHIPROCKET_EMAIL` and
//! `SHIPROCKET_PASSWORD` the shipment endpoints answer `503`.

pub mod auth;
pub mod client;
pub mod shipments;

pub use client::ShiprocketClient;
pub use shipments::*;

use thiserror::Error;

/// Errors that can occur when interacting with the Shiprocket API.
#[derive(Debug, Error)]
pub enum ShiprocketError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Shiprocket rejected the request.
    #[error("Shiprocket error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shiprocket.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Login failed (invalid email/password).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Bearer token expired or revoked.
    #[error("Access token expired")]
    TokenExpired,

    /// The request succeeded but the expected data was missing.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shiprocket_error_display() {
        let err = ShiprocketError::NotFound("awb 1234".to_string());
        assert_eq!(err.to_string(), "Not found: awb 1234");
    }

    #[test]
    fn test_api_error_display() {
        let err = ShiprocketError::Api {
            status: 422,
            message: "Invalid pincode".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Shiprocket error (HTTP 422): Invalid pincode"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ShiprocketError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
    }
}

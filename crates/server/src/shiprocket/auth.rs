//! Shiprocket login.
//!
//! Shiprocket issues a bearer token from email/password. The response does
//! not carry an expiry, so the token is treated as valid for nine days of its
//! documented ten.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ShiprocketError;

/// Lifetime assumed for a fresh token.
const TOKEN_LIFETIME_SECS: i64 = 9 * 24 * 60 * 60;

/// Bearer token obtained from login.
#[derive(Debug, Clone)]
pub struct ShiprocketToken {
    pub token: SecretString,
    /// Unix timestamp after which the token is not used.
    pub expires_at: i64,
}

impl ShiprocketToken {
    /// Check if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        // Consider expired if less than 60 seconds remaining
        now >= self.expires_at - 60
    }

    /// Check if the token will expire within the given number of seconds.
    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - seconds
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct LoginErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Log in to Shiprocket with an API user's email and password.
///
/// # Errors
///
/// Returns `ShiprocketError::AuthenticationFailed` if the credentials are
/// rejected.
#[instrument(skip(client, password), fields(email = %email))]
pub async fn login(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    password: &SecretString,
) -> Result<ShiprocketToken, ShiprocketError> {
    let now = chrono::Utc::now().timestamp();

    let response = client
        .post(format!("{base_url}/auth/login"))
        .json(&LoginRequest {
            email,
            password: password.expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        let body: LoginResponse = response.json().await?;
        Ok(ShiprocketToken {
            token: SecretString::from(body.token),
            expires_at: now + TOKEN_LIFETIME_SECS,
        })
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Err(ShiprocketError::RateLimited(60))
    } else {
        let message = response
            .json::<LoginErrorResponse>()
            .await
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("HTTP {status}"));
        Err(ShiprocketError::AuthenticationFailed(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_expired() {
        let now = chrono::Utc::now().timestamp();

        let expired = ShiprocketToken {
            token: SecretString::from("test"),
            expires_at: now - 3600,
        };
        assert!(expired.is_expired());

        let valid = ShiprocketToken {
            token: SecretString::from("test"),
            expires_at: now + TOKEN_LIFETIME_SECS,
        };
        assert!(!valid.is_expired());
        assert!(valid.expires_within(TOKEN_LIFETIME_SECS + 10));

        // Inside the 60 second buffer
        let almost = ShiprocketToken {
            token: SecretString::from("test"),
            expires_at: now + 30,
        };
        assert!(almost.is_expired());
    }
}

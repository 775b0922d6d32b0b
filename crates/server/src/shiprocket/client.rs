//! Shiprocket REST API client.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::instrument;

use super::ShiprocketError;
use super::auth::{ShiprocketToken, login};
use crate::config::ShiprocketConfig;

/// Shiprocket external API base URL.
pub const DEFAULT_BASE_URL: &str = "https://apiv2.shiprocket.in/v1/external";

/// Shiprocket API client.
///
/// Cheap to clone; clones share the HTTP connection pool and token cache.
///
/// # Authentication
///
/// Logs in with the configured API user on first use and again whenever
/// the cached token is expired or rejected.
#[derive(Clone)]
pub struct ShiprocketClient {
    inner: Arc<ShiprocketClientInner>,
}

struct ShiprocketClientInner {
    client: reqwest::Client,
    base_url: String,
    email: String,
    password: SecretString,
    pickup_location: String,
    /// In-memory token cache
    token: RwLock<Option<ShiprocketToken>>,
}

/// Shape of Shiprocket error bodies.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

impl ShiprocketClient {
    /// Create a client for the production API.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ShiprocketConfig) -> Result<Self, ShiprocketError> {
        Self::with_base_url(config, DEFAULT_BASE_URL)
    }

    /// Create a client against another base URL.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError::Http` if the HTTP client cannot be built.
    pub fn with_base_url(
        config: &ShiprocketConfig,
        base_url: &str,
    ) -> Result<Self, ShiprocketError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(ShiprocketClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_owned(),
                email: config.email.clone(),
                password: config.password.clone(),
                pickup_location: config.pickup_location.clone(),
                token: RwLock::new(None),
            }),
        })
    }

    /// Pickup location nickname configured in the Shiprocket panel.
    #[must_use]
    pub fn pickup_location(&self) -> &str {
        &self.inner.pickup_location
    }

    /// Check if we have a valid (non-expired) token.
    pub async fn has_valid_token(&self) -> bool {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .is_some_and(|token| !token.is_expired())
    }

    /// Clear the cached token.
    pub async fn clear_token(&self) {
        *self.inner.token.write().await = None;
    }

    /// Return a usable bearer token, logging in if needed.
    async fn access_token(&self) -> Result<String, ShiprocketError> {
        if let Some(token) = self.inner.token.read().await.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.expose_secret().to_owned());
        }

        let mut guard = self.inner.token.write().await;
        // Another request may have logged in while we waited for the lock.
        if let Some(token) = guard.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.expose_secret().to_owned());
        }

        let token = login(
            &self.inner.client,
            &self.inner.base_url,
            &self.inner.email,
            &self.inner.password,
        )
        .await?;
        let secret = token.token.expose_secret().to_owned();
        *guard = Some(token);
        Ok(secret)
    }

    /// POST a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError` for transport failures and non-success
    /// responses.
    #[instrument(skip(self, body))]
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ShiprocketError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let token = self.access_token().await?;
        let response = self
            .inner
            .client
            .post(format!("{}/{path}", self.inner.base_url))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        self.decode(path, response).await
    }

    /// GET and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError` for transport failures and non-success
    /// responses.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ShiprocketError> {
        let token = self.access_token().await?;
        let response = self
            .inner
            .client
            .get(format!("{}/{path}", self.inner.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        self.decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ShiprocketError> {
        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ShiprocketError::RateLimited(retry_after));
        }

        // A revoked token is dropped so the next call logs in again
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_token().await;
            return Err(ShiprocketError::TokenExpired);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ShiprocketError::NotFound(path.to_owned()));
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(ShiprocketError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Best human-readable message from an error body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => message,
        Ok(ErrorBody {
            errors: Some(errors),
            ..
        }) => errors.to_string(),
        _ if body.trim().is_empty() => "empty response".to_owned(),
        _ => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ShiprocketConfig {
        ShiprocketConfig {
            email: "api@stride.test".to_owned(),
            password: SecretString::from("pw"),
            pickup_location: "Primary".to_owned(),
            webhook_token: None,
        }
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = ShiprocketClient::with_base_url(&config(), "http://localhost:9/").unwrap();
        assert_eq!(client.inner.base_url, "http://localhost:9");
        assert_eq!(client.pickup_location(), "Primary");
        assert!(!client.has_valid_token().await);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(r#"{"message":"Invalid pincode"}"#), "Invalid pincode");
        assert_eq!(
            error_message(r#"{"errors":{"awb":["required"]}}"#),
            r#"{"awb":["required"]}"#
        );
        assert_eq!(error_message(""), "empty response");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}

//! Expo push API client.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};

use super::{PushError, PushMessage, PushReport, PushResponse, tally};
use crate::config::ExpoConfig;

const EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Expo accepts at most this many messages per request.
pub const BATCH_SIZE: usize = 100;

/// Expo push client.
#[derive(Clone)]
pub struct PushClient {
    client: Client,
    endpoint: String,
    access_token: Option<SecretString>,
}

impl std::fmt::Debug for PushClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushClient")
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl PushClient {
    #[must_use]
    pub fn new(config: &ExpoConfig) -> Self {
        Self::with_endpoint(config, EXPO_PUSH_URL)
    }

    #[must_use]
    pub fn with_endpoint(config: &ExpoConfig, endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_owned(),
            access_token: config.access_token.clone(),
        }
    }

    /// Send one notification to every token.
    ///
    /// A failed batch counts all of its messages as failed; later batches are
    /// still attempted.
    #[instrument(skip(self, tokens, data), fields(tokens = tokens.len()))]
    pub async fn broadcast(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: Option<&serde_json::Value>,
    ) -> PushReport {
        let mut report = PushReport::default();
        for batch in tokens.chunks(BATCH_SIZE) {
            let messages: Vec<PushMessage> = batch
                .iter()
                .map(|to| PushMessage {
                    to: to.clone(),
                    title: title.to_owned(),
                    body: body.to_owned(),
                    data: data.cloned(),
                    sound: "default",
                })
                .collect();

            match self.send_batch(batch, &messages).await {
                Ok(batch_report) => report.merge(batch_report),
                Err(e) => {
                    warn!(error = %e, batch = batch.len(), "Expo push batch failed");
                    report.failed += i32::try_from(batch.len()).unwrap_or(i32::MAX);
                }
            }
        }
        debug!(sent = report.sent, failed = report.failed, "Push broadcast finished");
        report
    }

    /// Send one batch of at most [`BATCH_SIZE`] messages.
    ///
    /// # Errors
    ///
    /// Returns `PushError` if the request fails or Expo rejects the batch.
    pub async fn send_batch(
        &self,
        tokens: &[String],
        messages: &[PushMessage],
    ) -> Result<PushReport, PushError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(messages);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PushError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: PushResponse = response
            .json()
            .await
            .map_err(|e| PushError::Response(e.to_string()))?;
        tally(tokens, parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let client = PushClient::new(&ExpoConfig {
            access_token: Some(SecretString::from("expo-secret")),
        });
        let debug = format!("{client:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("expo-secret"));
    }

    #[tokio::test]
    async fn test_broadcast_without_tokens_sends_nothing() {
        let client = PushClient::with_endpoint(&ExpoConfig::default(), "http://127.0.0.1:9/push");
        let report = client.broadcast(&[], "Hi", "There", None).await;
        assert_eq!(report, PushReport::default());
    }
}

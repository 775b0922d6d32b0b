//! Expo push notification delivery.
//!
//! Messages go to `https://exp.host/--/api/v2/push/send` in batches of at
//! most 100. Expo answers with one ticket per message; tickets reporting
//! `DeviceNotRegistered` identify tokens that should be forgotten.

mod client;

pub use client::PushClient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when talking to the Expo push service.
#[derive(Debug, Error)]
pub enum PushError {
    /// HTTP request failed.
    #[error("Push request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Expo rejected the whole batch.
    #[error("Expo push error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Response did not match the ticket format.
    #[error("Push response error: {0}")]
    Response(String),
}

/// A single message in an Expo batch.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub sound: &'static str,
}

/// Outcome of a broadcast across all batches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub sent: i32,
    pub failed: i32,
    /// Tokens Expo reported as no longer registered.
    #[serde(skip)]
    pub invalid_tokens: Vec<String>,
}

impl PushReport {
    fn merge(&mut self, other: Self) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.invalid_tokens.extend(other.invalid_tokens);
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    #[serde(default)]
    data: Vec<PushTicket>,
    #[serde(default)]
    errors: Vec<PushApiError>,
}

#[derive(Debug, Deserialize)]
struct PushTicket {
    status: String,
    #[serde(default)]
    details: Option<TicketDetails>,
}

#[derive(Debug, Deserialize)]
struct TicketDetails {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushApiError {
    #[serde(default)]
    message: String,
}

/// Count tickets for one batch, pairing them with the tokens they were sent to.
fn tally(tokens: &[String], response: PushResponse) -> Result<PushReport, PushError> {
    if response.data.is_empty()
        && let Some(error) = response.errors.first()
    {
        return Err(PushError::Response(error.message.clone()));
    }
    if response.data.len() != tokens.len() {
        return Err(PushError::Response(format!(
            "expected {} tickets, got {}",
            tokens.len(),
            response.data.len()
        )));
    }

    let mut report = PushReport::default();
    for (token, ticket) in tokens.iter().zip(response.data) {
        if ticket.status == "ok" {
            report.sent += 1;
            continue;
        }
        report.failed += 1;
        if ticket
            .details
            .and_then(|d| d.error)
            .is_some_and(|e| e == "DeviceNotRegistered")
        {
            report.invalid_tokens.push(token.clone());
        }
    }
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tokens(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("ExponentPushToken[{i}]")).collect()
    }

    #[test]
    fn test_tally_counts_tickets() {
        let response: PushResponse = serde_json::from_str(
            r#"{"data": [
                {"status": "ok", "id": "a"},
                {"status": "error", "message": "gone", "details": {"error": "DeviceNotRegistered"}},
                {"status": "error", "message": "too big", "details": {"error": "MessageTooBig"}}
            ]}"#,
        )
        .unwrap();
        let report = tally(&tokens(3), response).unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.invalid_tokens, vec!["ExponentPushToken[1]".to_owned()]);
    }

    #[test]
    fn test_tally_batch_error() {
        let response: PushResponse =
            serde_json::from_str(r#"{"errors": [{"code": "VALIDATION_ERROR", "message": "bad"}]}"#)
                .unwrap();
        assert!(matches!(
            tally(&tokens(2), response),
            Err(PushError::Response(m)) if m == "bad"
        ));
    }

    #[test]
    fn test_tally_ticket_count_mismatch() {
        let response: PushResponse =
            serde_json::from_str(r#"{"data": [{"status": "ok"}]}"#).unwrap();
        assert!(tally(&tokens(2), response).is_err());
    }

    #[test]
    fn test_report_merge() {
        let mut total = PushReport {
            sent: 2,
            failed: 0,
            invalid_tokens: vec![],
        };
        total.merge(PushReport {
            sent: 1,
            failed: 1,
            invalid_tokens: vec!["t".to_owned()],
        });
        assert_eq!(total.sent, 3);
        assert_eq!(total.failed, 1);
        assert_eq!(total.invalid_tokens.len(), 1);
    }
}

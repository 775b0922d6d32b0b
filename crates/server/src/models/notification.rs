//! Push devices and broadcast history.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stride_core::{NotificationId, PushTokenId, UserId};

/// A registered Expo push token.
#[derive(Debug, Clone, Serialize)]
pub struct PushToken {
    pub id: PushTokenId,
    pub user_id: Option<UserId>,
    pub token: String,
    pub platform: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Device registration body.
#[derive(Debug, Deserialize)]
pub struct PushTokenInput {
    pub token: String,
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_platform() -> String {
    "unknown".to_owned()
}

impl PushTokenInput {
    /// Expo tokens look like `ExponentPushToken[...]` or `ExpoPushToken[...]`.
    #[must_use]
    pub fn is_expo_token(&self) -> bool {
        let token = self.token.trim();
        (token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken["))
            && token.ends_with(']')
    }
}

/// Which devices a broadcast targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    All,
    /// Devices linked to a customer account.
    Registered,
    /// Devices with no account.
    Guests,
}

impl Audience {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Registered => "registered",
            Self::Guests => "guests",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "registered" => Ok(Self::Registered),
            "guests" => Ok(Self::Guests),
            other => Err(format!("invalid audience: {other}")),
        }
    }
}

/// Admin broadcast body.
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub audience: Audience,
    /// Deep link opened when the notification is tapped.
    pub link: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl BroadcastRequest {
    /// Payload delivered with the message, merging `link` into `data`.
    #[must_use]
    pub fn payload(&self) -> Option<serde_json::Value> {
        let mut data = match &self.data {
            Some(serde_json::Value::Object(map)) => map.clone(),
            Some(_) | None => serde_json::Map::new(),
        };
        if let Some(link) = &self.link {
            data.insert("link".to_owned(), serde_json::Value::String(link.clone()));
        }
        (!data.is_empty()).then_some(serde_json::Value::Object(data))
    }
}

/// A broadcast history entry.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    pub audience: Audience,
    pub data: Option<serde_json::Value>,
    pub sent_count: i32,
    pub failed_count: i32,
    pub sent_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_expo_token_shape() {
        let input = PushTokenInput {
            token: "ExponentPushToken[abc123]".to_owned(),
            platform: "ios".to_owned(),
        };
        assert!(input.is_expo_token());
        let input = PushTokenInput {
            token: "abc123".to_owned(),
            platform: "ios".to_owned(),
        };
        assert!(!input.is_expo_token());
    }

    #[test]
    fn test_audience_round_trip() {
        for audience in [Audience::All, Audience::Registered, Audience::Guests] {
            assert_eq!(audience.as_str().parse::<Audience>(), Ok(audience));
        }
    }

    #[test]
    fn test_payload_merges_link() {
        let req = BroadcastRequest {
            title: "New drop".to_owned(),
            body: "Court Runner is back".to_owned(),
            audience: Audience::All,
            link: Some("/products/court-runner".to_owned()),
            data: Some(json!({"campaign": "restock"})),
        };
        assert_eq!(
            req.payload(),
            Some(json!({"campaign": "restock", "link": "/products/court-runner"}))
        );

        let bare = BroadcastRequest {
            link: None,
            data: None,
            ..req
        };
        assert_eq!(bare.payload(), None);
    }
}

//! Site settings: a key/JSON store behind the CMS screens.
//!
//! Known keys get shape checks; other keys accept any JSON object so new
//! storefront sections can be configured without a migration.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use stride_core::{HexColor, UserId};

/// Theme colors and other storefront styling.
pub const THEME: &str = "theme";
/// Site-wide announcement bar.
pub const ANNOUNCEMENT: &str = "announcement";
pub const CONTACT: &str = "contact";
pub const SEO: &str = "seo";

#[derive(Debug, Clone, Serialize)]
pub struct SiteSetting {
    pub key: String,
    pub value: Value,
    pub updated_by: Option<UserId>,
    pub updated_at: DateTime<Utc>,
}

/// Every setting keyed by name, as served to the storefront.
pub type SiteConfig = BTreeMap<String, Value>;

#[derive(Debug, Deserialize)]
pub struct SettingInput {
    pub value: Value,
}

/// Check a setting key.
///
/// # Errors
///
/// Returns a message unless the key is 1-64 lowercase letters, digits or `_`.
pub fn validate_key(key: &str) -> Result<(), String> {
    let ok = !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(format!("invalid setting key {key:?}"))
    }
}

/// Validate a setting value and return it in canonical form.
///
/// Theme entries whose name ends in `color` must be hex colors and are
/// rewritten to lowercase `#rrggbb`.
///
/// # Errors
///
/// Returns a message describing the first invalid entry.
pub fn validate_setting(key: &str, value: Value) -> Result<Value, String> {
    validate_key(key)?;
    let Value::Object(mut map) = value else {
        return Err(format!("setting {key} must be a JSON object"));
    };

    match key {
        THEME => {
            for (name, entry) in &mut map {
                if !name.ends_with("color") {
                    continue;
                }
                let raw = entry
                    .as_str()
                    .ok_or_else(|| format!("theme {name} must be a string"))?;
                let color = HexColor::parse(raw).map_err(|e| e.to_string())?;
                *entry = Value::String(color.as_str().to_owned());
            }
        }
        ANNOUNCEMENT => {
            if !map.get("text").is_some_and(Value::is_string) {
                return Err("announcement text is required".to_owned());
            }
            if map.get("is_active").is_some_and(|v| !v.is_boolean()) {
                return Err("announcement is_active must be a boolean".to_owned());
            }
        }
        CONTACT => {
            if let Some(email) = map.get("email") {
                let email = email.as_str().unwrap_or_default();
                stride_core::Email::parse(email).map_err(|e| e.to_string())?;
            }
        }
        _ => {}
    }

    Ok(Value::Object(map))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_theme_colors_are_canonicalized() {
        let value = validate_setting(
            THEME,
            json!({"primary_color": "#F60", "font": "Inter", "accent_color": "#1A2B3C"}),
        )
        .unwrap();
        assert_eq!(value["primary_color"], "#ff6600");
        assert_eq!(value["accent_color"], "#1a2b3c");
        assert_eq!(value["font"], "Inter");
    }

    #[test]
    fn test_theme_rejects_bad_color() {
        assert!(validate_setting(THEME, json!({"primary_color": "orange"})).is_err());
        assert!(validate_setting(THEME, json!({"primary_color": 3})).is_err());
    }

    #[test]
    fn test_value_must_be_object() {
        assert!(validate_setting(SEO, json!("title")).is_err());
        assert!(validate_setting("hero_section", json!({"anything": [1, 2]})).is_ok());
    }

    #[test]
    fn test_announcement_requires_text() {
        assert!(validate_setting(ANNOUNCEMENT, json!({"is_active": true})).is_err());
        assert!(validate_setting(ANNOUNCEMENT, json!({"text": "Free shipping"})).is_ok());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("theme").is_ok());
        assert!(validate_key("Theme").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("a/b").is_err());
    }
}

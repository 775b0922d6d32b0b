//! Theme colors for the admin-configurable site theme.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid hex color {0:?}: expected #rgb or #rrggbb")]
pub struct HexColorError(pub String);

/// A CSS hex color such as `#ff6b00`.
///
/// Three-digit shorthand is expanded and the value is lowercased, so the
/// storefront can write it straight into a CSS custom property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    /// Parse a `#rgb` or `#rrggbb` color.
    ///
    /// # Errors
    ///
    /// Returns [`HexColorError`] when the input is not a hex color.
    pub fn parse(s: &str) -> Result<Self, HexColorError> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('#')
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| HexColorError(s.to_owned()))?;

        let expanded = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => digits.to_owned(),
            _ => return Err(HexColorError(s.to_owned())),
        };

        Ok(Self(format!("#{}", expanded.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HexColor {
    type Error = HexColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_shorthand() {
        assert_eq!(HexColor::parse("#F60").unwrap().as_str(), "#ff6600");
    }

    #[test]
    fn test_accepts_full_form() {
        assert_eq!(HexColor::parse(" #1A1A1A ").unwrap().as_str(), "#1a1a1a");
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(HexColor::parse("1a1a1a").is_err());
        assert!(HexColor::parse("#12345").is_err());
        assert!(HexColor::parse("#gggggg").is_err());
        assert!(HexColor::parse("red").is_err());
    }
}

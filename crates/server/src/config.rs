//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `STRIDE_HOST` - Bind address (default: 127.0.0.1)
//! - `STRIDE_PORT` - Listen port (default: 3000)
//! - `STRIDE_BASE_URL` - Public URL of the API (default: <http://localhost:3000>)
//! - `STRIDE_CORS_ORIGINS` - Comma-separated origins of the storefront and admin UIs
//! - `STRIDE_CURRENCY` - ISO currency code (default: INR)
//! - `STRIDE_FREE_SHIPPING_THRESHOLD` - Orders at or above ship free (default: 999)
//! - `STRIDE_SHIPPING_FEE` - Flat shipping fee below the threshold (default: 79)
//! - `STRIDE_LOW_STOCK_THRESHOLD` - Inventory low-stock flag (default: 5)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - Error tracking
//!
//! ## Optional (Shiprocket - enables shipment creation and tracking)
//! - `SHIPROCKET_EMAIL` - API user email
//! - `SHIPROCKET_PASSWORD` - API user password
//! - `SHIPROCKET_PICKUP_LOCATION` - Pickup location nickname (default: Primary)
//! - `SHIPROCKET_WEBHOOK_TOKEN` - Shared token expected in the `x-api-key` header
//!
//! ## Optional (Razorpay - enables online payments)
//! - `RAZORPAY_KEY_ID` - Public key id returned to the checkout UI
//! - `RAZORPAY_KEY_SECRET` - Secret used to verify payment signatures
//!
//! ## Optional (Expo - push notifications)
//! - `EXPO_ACCESS_TOKEN` - Access token for the Expo push service

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use rust_decimal::Decimal;
use secrecy::SecretString;
use stride_core::CurrencyCode;
use stride_core::order::ShippingPolicy;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_PICKUP_LOCATION: &str = "Primary";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL, used to decide whether cookies are `Secure`
    pub base_url: String,
    /// Origins allowed to call the API with credentials
    pub cors_origins: Vec<String>,
    pub store: StoreConfig,
    pub shiprocket: Option<ShiprocketConfig>,
    pub razorpay: Option<RazorpayConfig>,
    pub expo: ExpoConfig,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Store-wide commercial settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub currency: CurrencyCode,
    pub shipping: ShippingPolicy,
    /// Stock at or below this is flagged as low in the inventory view
    pub low_stock_threshold: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::INR,
            shipping: ShippingPolicy {
                flat_fee: Decimal::from(79),
                free_threshold: Decimal::from(999),
            },
            low_stock_threshold: 5,
        }
    }
}

/// Shiprocket API configuration.
///
/// Implements `Debug` manually to redact the password and webhook token.
#[derive(Clone)]
pub struct ShiprocketConfig {
    pub email: String,
    pub password: SecretString,
    /// Pickup location nickname as configured in the Shiprocket panel
    pub pickup_location: String,
    /// Token Shiprocket sends with tracking webhooks
    pub webhook_token: Option<SecretString>,
}

impl std::fmt::Debug for ShiprocketConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShiprocketConfig")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("pickup_location", &self.pickup_location)
            .field(
                "webhook_token",
                &self.webhook_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Razorpay credentials for online payment verification.
///
/// Implements `Debug` manually to redact the key secret.
#[derive(Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: SecretString,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish()
    }
}

/// Expo push service configuration.
#[derive(Clone, Default)]
pub struct ExpoConfig {
    /// Optional; Expo accepts unauthenticated pushes unless enhanced security is on
    pub access_token: Option<SecretString>,
}

impl std::fmt::Debug for ExpoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpoConfig")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("DATABASE_URL")?);
        let host = parse_env("STRIDE_HOST", "127.0.0.1")?;
        let port = parse_env("STRIDE_PORT", "3000")?;
        let base_url = get_env_or_default("STRIDE_BASE_URL", "http://localhost:3000");
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("STRIDE_BASE_URL".to_string(), e.to_string()))?;
        let cors_origins = parse_list(&get_env_or_default("STRIDE_CORS_ORIGINS", ""));

        let store = StoreConfig::from_env()?;
        let shiprocket = ShiprocketConfig::from_env()?;
        let razorpay = RazorpayConfig::from_env()?;
        let expo = ExpoConfig {
            access_token: get_optional_env("EXPO_ACCESS_TOKEN").map(SecretString::from),
        };

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            cors_origins,
            store,
            shiprocket,
            razorpay,
            expo,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public URL is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let currency = get_optional_env("STRIDE_CURRENCY")
            .map(|c| {
                c.parse::<CurrencyCode>()
                    .map_err(|e| ConfigError::InvalidEnvVar("STRIDE_CURRENCY".to_string(), e))
            })
            .transpose()?
            .unwrap_or(defaults.currency);

        let free_threshold = parse_decimal_env(
            "STRIDE_FREE_SHIPPING_THRESHOLD",
            defaults.shipping.free_threshold,
        )?;
        let flat_fee = parse_decimal_env("STRIDE_SHIPPING_FEE", defaults.shipping.flat_fee)?;
        let low_stock_threshold = parse_env("STRIDE_LOW_STOCK_THRESHOLD", "5")?;

        Ok(Self {
            currency,
            shipping: ShippingPolicy {
                flat_fee,
                free_threshold,
            },
            low_stock_threshold,
        })
    }
}

impl ShiprocketConfig {
    /// Returns `None` when Shiprocket is not configured. Email and password
    /// must be set together.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let email = get_optional_env("SHIPROCKET_EMAIL");
        let password = get_optional_env("SHIPROCKET_PASSWORD");

        match (email, password) {
            (Some(email), Some(password)) => {
                let webhook_token = get_optional_env("SHIPROCKET_WEBHOOK_TOKEN")
                    .map(|token| {
                        validate_secret_strength(&token, "SHIPROCKET_WEBHOOK_TOKEN")?;
                        Ok::<_, ConfigError>(SecretString::from(token))
                    })
                    .transpose()?;

                Ok(Some(Self {
                    email,
                    password: SecretString::from(password),
                    pickup_location: get_env_or_default(
                        "SHIPROCKET_PICKUP_LOCATION",
                        DEFAULT_PICKUP_LOCATION,
                    ),
                    webhook_token,
                }))
            }
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SHIPROCKET_*".to_string(),
                "Both SHIPROCKET_EMAIL and SHIPROCKET_PASSWORD must be set together".to_string(),
            )),
        }
    }
}

impl RazorpayConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let key_id = get_optional_env("RAZORPAY_KEY_ID");
        let key_secret = get_optional_env("RAZORPAY_KEY_SECRET");

        match (key_id, key_secret) {
            (Some(key_id), Some(secret)) => {
                validate_secret_strength(&secret, "RAZORPAY_KEY_SECRET")?;
                Ok(Some(Self {
                    key_id,
                    key_secret: SecretString::from(secret),
                }))
            }
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "RAZORPAY_*".to_string(),
                "Both RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET must be set together".to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_decimal_env(key: &str, default: Decimal) -> Result<Decimal, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<Decimal>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if value < Decimal::ZERO {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(value)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-razorpay-secret", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
        assert!(validate_secret_strength(&"a".repeat(40), "TEST_VAR").is_err());
        assert!(validate_secret_strength("q8Jz2LmN4vR7tY1wXc9KpB3d", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_parse_list_trims_and_drops_empty() {
        assert_eq!(
            parse_list(" https://stride.shoes/ ,,https://admin.stride.shoes"),
            vec!["https://stride.shoes", "https://admin.stride.shoes"]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_store_defaults() {
        let store = StoreConfig::default();
        assert_eq!(store.currency, CurrencyCode::INR);
        assert_eq!(store.shipping.free_threshold, Decimal::from(999));
        assert_eq!(store.low_stock_threshold, 5);
    }

    #[test]
    fn test_secret_configs_redact_debug() {
        let shiprocket = ShiprocketConfig {
            email: "ops@stride.shoes".to_string(),
            password: SecretString::from("super_secret_shiprocket_password"),
            pickup_location: "Warehouse".to_string(),
            webhook_token: Some(SecretString::from("super_secret_webhook_token")),
        };
        let debug_output = format!("{shiprocket:?}");
        assert!(debug_output.contains("ops@stride.shoes"));
        assert!(debug_output.contains("Warehouse"));
        assert!(!debug_output.contains("super_secret"));

        let razorpay = RazorpayConfig {
            key_id: "rzp_live_abc".to_string(),
            key_secret: SecretString::from("super_secret_key_secret"),
        };
        let debug_output = format!("{razorpay:?}");
        assert!(debug_output.contains("rzp_live_abc"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/stride"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://api.stride.shoes".to_string(),
            cors_origins: vec![],
            store: StoreConfig::default(),
            shiprocket: None,
            razorpay: None,
            expo: ExpoConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        assert_eq!(config.socket_addr().port(), 3000);
        assert!(config.is_secure());
    }
}

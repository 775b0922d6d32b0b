//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::ContentCache;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::push::PushClient;
use crate::shiprocket::{ShiprocketClient, ShiprocketError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    shiprocket: Option<ShiprocketClient>,
    push: PushClient,
    cache: ContentCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Shiprocket HTTP client cannot be built.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, ShiprocketError> {
        let shiprocket = config
            .shiprocket
            .as_ref()
            .map(ShiprocketClient::new)
            .transpose()?;
        let push = PushClient::new(&config.expo);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shiprocket,
                push,
                cache: ContentCache::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The Shiprocket client, if configured.
    #[must_use]
    pub fn shiprocket(&self) -> Option<&ShiprocketClient> {
        self.inner.shiprocket.as_ref()
    }

    /// The Shiprocket client, or `503` when the integration is off.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ServiceUnavailable` if Shiprocket is not configured.
    pub fn require_shiprocket(&self) -> Result<&ShiprocketClient, AppError> {
        self.shiprocket().ok_or_else(|| {
            AppError::ServiceUnavailable("Shiprocket is not configured".to_string())
        })
    }

    #[must_use]
    pub fn push(&self) -> &PushClient {
        &self.inner.push
    }

    #[must_use]
    pub fn cache(&self) -> &ContentCache {
        &self.inner.cache
    }
}

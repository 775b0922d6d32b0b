//! In-process cache for public content that changes rarely.
//!
//! The storefront reads site settings and filters on every page load. Both
//! are cached for five minutes and invalidated by the admin endpoints that
//! write them.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::models::filter::Filter;
use crate::models::settings::SiteConfig;

/// Cache key for public content.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    SiteConfig,
    ActiveFilters,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    SiteConfig(Arc<SiteConfig>),
    Filters(Arc<Vec<Filter>>),
}

/// Shared content cache.
#[derive(Clone)]
pub struct ContentCache {
    inner: Cache<CacheKey, CacheValue>,
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(16)
                .time_to_live(Duration::from_secs(300)) // 5 minutes
                .build(),
        }
    }

    pub async fn site_config(&self) -> Option<Arc<SiteConfig>> {
        match self.inner.get(&CacheKey::SiteConfig).await {
            Some(CacheValue::SiteConfig(config)) => Some(config),
            _ => None,
        }
    }

    pub async fn put_site_config(&self, config: Arc<SiteConfig>) {
        self.inner
            .insert(CacheKey::SiteConfig, CacheValue::SiteConfig(config))
            .await;
    }

    pub async fn active_filters(&self) -> Option<Arc<Vec<Filter>>> {
        match self.inner.get(&CacheKey::ActiveFilters).await {
            Some(CacheValue::Filters(filters)) => Some(filters),
            _ => None,
        }
    }

    pub async fn put_active_filters(&self, filters: Arc<Vec<Filter>>) {
        self.inner
            .insert(CacheKey::ActiveFilters, CacheValue::Filters(filters))
            .await;
    }

    /// Drop one cached entry after a write.
    pub async fn invalidate(&self, key: CacheKey) {
        self.inner.invalidate(&key).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_site_config_roundtrip_and_invalidate() {
        let cache = ContentCache::new();
        assert!(cache.site_config().await.is_none());

        let mut config = SiteConfig::new();
        config.insert("theme".to_owned(), json!({"primary_color": "#111111"}));
        cache.put_site_config(Arc::new(config)).await;

        let cached = cache.site_config().await.unwrap();
        assert_eq!(cached["theme"]["primary_color"], "#111111");

        cache.invalidate(CacheKey::SiteConfig).await;
        assert!(cache.site_config().await.is_none());
    }

    #[tokio::test]
    async fn test_keys_do_not_collide() {
        let cache = ContentCache::new();
        cache.put_active_filters(Arc::new(Vec::new())).await;
        assert!(cache.site_config().await.is_none());
        assert!(cache.active_filters().await.is_some());
    }
}

//! Storefront content: site settings, filters, banners and reviews.
//!
//! Site settings and active filters are served from the content cache and
//! invalidated by every write here.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::instrument;

use stride_core::{BannerId, FilterId, ProductId, ReviewId, ReviewStatus, UserId};

use crate::cache::CacheKey;
use crate::db::{
    BannerRepository, FilterRepository, Page, Pagination, ProductRepository, ReviewRepository,
    SettingsRepository,
};
use crate::error::{AppError, Result};
use crate::models::banner::{Banner, BannerInput};
use crate::models::filter::{Filter, FilterInput};
use crate::models::review::{Review, ReviewInput, ReviewQuery};
use crate::models::settings::{SiteConfig, SiteSetting, validate_key, validate_setting};
use crate::state::AppState;

pub struct ContentService<'a> {
    state: &'a AppState,
}

impl<'a> ContentService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    // Settings

    /// Every setting as one JSON object, cached.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on a cache miss if the query fails.
    pub async fn site_config(&self) -> Result<Arc<SiteConfig>> {
        if let Some(config) = self.state.cache().site_config().await {
            return Ok(config);
        }
        let settings = SettingsRepository::new(self.state.pool()).list().await?;
        let config: Arc<SiteConfig> = Arc::new(
            settings
                .into_iter()
                .map(|s| (s.key, s.value))
                .collect(),
        );
        self.state.cache().put_site_config(Arc::clone(&config)).await;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn settings(&self) -> Result<Vec<SiteSetting>> {
        Ok(SettingsRepository::new(self.state.pool()).list().await?)
    }

    /// Validate and store one setting.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an invalid key or value.
    #[instrument(skip(self, value))]
    pub async fn put_setting(&self, key: &str, value: Value, actor: UserId) -> Result<SiteSetting> {
        let value = validate_setting(key, value).map_err(AppError::BadRequest)?;
        let setting = SettingsRepository::new(self.state.pool())
            .upsert(key, &value, Some(actor))
            .await?;
        self.state.cache().invalidate(CacheKey::SiteConfig).await;
        tracing::info!(actor = %actor, "Site setting updated");
        Ok(setting)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` with `NotFound` for an unknown key.
    pub async fn delete_setting(&self, key: &str) -> Result<()> {
        validate_key(key).map_err(AppError::BadRequest)?;
        SettingsRepository::new(self.state.pool()).delete(key).await?;
        self.state.cache().invalidate(CacheKey::SiteConfig).await;
        Ok(())
    }

    // Filters

    /// Active filters in display order, cached.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on a cache miss if the query fails.
    pub async fn active_filters(&self) -> Result<Arc<Vec<Filter>>> {
        if let Some(filters) = self.state.cache().active_filters().await {
            return Ok(filters);
        }
        let filters = Arc::new(FilterRepository::new(self.state.pool()).list(true).await?);
        self.state
            .cache()
            .put_active_filters(Arc::clone(&filters))
            .await;
        Ok(filters)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn filters(&self) -> Result<Vec<Filter>> {
        Ok(FilterRepository::new(self.state.pool()).list(false).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid input.
    pub async fn create_filter(&self, mut input: FilterInput) -> Result<Filter> {
        input.normalize().map_err(AppError::BadRequest)?;
        let filter = FilterRepository::new(self.state.pool()).create(&input).await?;
        self.state.cache().invalidate(CacheKey::ActiveFilters).await;
        Ok(filter)
    }

    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid input.
    pub async fn update_filter(&self, id: FilterId, mut input: FilterInput) -> Result<Filter> {
        input.normalize().map_err(AppError::BadRequest)?;
        let filter = FilterRepository::new(self.state.pool())
            .update(id, &input)
            .await?;
        self.state.cache().invalidate(CacheKey::ActiveFilters).await;
        Ok(filter)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` with `NotFound` for an unknown filter.
    pub async fn delete_filter(&self, id: FilterId) -> Result<()> {
        FilterRepository::new(self.state.pool()).delete(id).await?;
        self.state.cache().invalidate(CacheKey::ActiveFilters).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an empty or duplicated id list.
    pub async fn reorder_filters(&self, ids: &[i32]) -> Result<Vec<Filter>> {
        check_order(ids)?;
        let repo = FilterRepository::new(self.state.pool());
        repo.reorder(ids).await?;
        self.state.cache().invalidate(CacheKey::ActiveFilters).await;
        Ok(repo.list(false).await?)
    }

    // Banners

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn live_banners(&self) -> Result<Vec<Banner>> {
        Ok(BannerRepository::new(self.state.pool())
            .live(Utc::now())
            .await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn banners(&self) -> Result<Vec<Banner>> {
        Ok(BannerRepository::new(self.state.pool()).list().await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid input.
    pub async fn create_banner(&self, mut input: BannerInput) -> Result<Banner> {
        input.normalize().map_err(AppError::BadRequest)?;
        Ok(BannerRepository::new(self.state.pool()).create(&input).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid input.
    pub async fn update_banner(&self, id: BannerId, mut input: BannerInput) -> Result<Banner> {
        input.normalize().map_err(AppError::BadRequest)?;
        Ok(BannerRepository::new(self.state.pool())
            .update(id, &input)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` with `NotFound` for an unknown banner.
    pub async fn delete_banner(&self, id: BannerId) -> Result<()> {
        Ok(BannerRepository::new(self.state.pool()).delete(id).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an empty or duplicated id list.
    pub async fn reorder_banners(&self, ids: &[i32]) -> Result<Vec<Banner>> {
        check_order(ids)?;
        let repo = BannerRepository::new(self.state.pool());
        repo.reorder(ids).await?;
        Ok(repo.list().await?)
    }

    // Reviews

    /// Submit a review for an active product. One review per customer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid input, `AppError::NotFound`
    /// for an unknown product and a conflict for a second review.
    #[instrument(skip(self, input), fields(product_id = %product_id, user_id = %user))]
    pub async fn submit_review(
        &self,
        product_id: ProductId,
        user: UserId,
        input: &ReviewInput,
    ) -> Result<Review> {
        input.validate().map_err(AppError::BadRequest)?;
        ProductRepository::new(self.state.pool())
            .get_by_id(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let reviews = ReviewRepository::new(self.state.pool());
        let id = reviews.create(product_id, user, input).await?;
        reviews
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Review".to_string()))
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn reviews(&self, query: &ReviewQuery) -> Result<Page<Review>> {
        let pagination = Pagination::new(query.page, query.per_page);
        Ok(ReviewRepository::new(self.state.pool())
            .list(query, pagination)
            .await?)
    }

    /// Approve or reject a review.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when asked to move a review back to
    /// pending.
    pub async fn moderate_review(&self, id: ReviewId, status: ReviewStatus) -> Result<Review> {
        if status == ReviewStatus::Pending {
            return Err(AppError::BadRequest(
                "reviews can only be approved or rejected".to_string(),
            ));
        }
        let reviews = ReviewRepository::new(self.state.pool());
        reviews.set_status(id, status).await?;
        reviews
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Review".to_string()))
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` with `NotFound` for an unknown review.
    pub async fn delete_review(&self, id: ReviewId) -> Result<()> {
        Ok(ReviewRepository::new(self.state.pool()).delete(id).await?)
    }
}

/// An ordering must list each id once.
fn check_order(ids: &[i32]) -> Result<()> {
    if ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".to_string()));
    }
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != ids.len() {
        return Err(AppError::BadRequest("ids must not repeat".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_order() {
        assert!(check_order(&[3, 1, 2]).is_ok());
        assert!(check_order(&[]).is_err());
        assert!(check_order(&[1, 2, 1]).is_err());
    }
}

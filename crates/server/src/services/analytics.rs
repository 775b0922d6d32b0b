//! Storefront event ingestion and dashboard aggregates.

use sqlx::PgPool;

use stride_core::analytics::{average_order_value, build_funnel, classify_device, percentage};
use stride_core::UserId;

use crate::db::AnalyticsRepository;
use crate::db::analytics::NewEvent;
use crate::error::{AppError, Result};
use crate::models::analytics::{
    DailyRevenue, DateRange, DateRangeQuery, DeviceCount, EventInput, Funnel, RevenueSummary,
    StatusCount, TopProduct, fill_days,
};

const MAX_PATH: usize = 512;
const DEFAULT_TOP_PRODUCTS: i64 = 10;
const MAX_TOP_PRODUCTS: i64 = 50;

/// Cap a path at `MAX_PATH` bytes without splitting a character.
fn truncate_path(path: &str) -> &str {
    if path.len() <= MAX_PATH {
        return path;
    }
    let end = (0..=MAX_PATH)
        .rev()
        .find(|&i| path.is_char_boundary(i))
        .unwrap_or_default();
    path.get(..end).unwrap_or_default()
}

/// Resolve a dashboard range against today's date.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an inverted or oversized range.
pub fn resolve_range(query: DateRangeQuery) -> Result<DateRange> {
    DateRange::resolve(query, DateRange::today()).map_err(AppError::BadRequest)
}

pub struct AnalyticsService<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> AnalyticsRepository<'_> {
        AnalyticsRepository::new(self.pool)
    }

    /// Store one storefront event.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the insert fails.
    pub async fn record(
        &self,
        input: &EventInput,
        session_id: &str,
        user: Option<UserId>,
        user_agent: &str,
    ) -> Result<()> {
        let path = input
            .path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(truncate_path);
        self.repo()
            .record(&NewEvent {
                kind: input.kind,
                path,
                product_id: input.product_id,
                session_id,
                user_id: user,
                device: classify_device(user_agent),
            })
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn summary(&self, range: DateRange) -> Result<RevenueSummary> {
        let totals = self.repo().revenue(range).await?;
        Ok(RevenueSummary {
            range,
            gross_revenue: totals.gross,
            order_count: totals.orders,
            average_order_value: average_order_value(totals.gross, totals.orders),
            discounts: totals.discounts,
        })
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn orders_by_status(&self, range: DateRange) -> Result<Vec<StatusCount>> {
        Ok(self.repo().orders_by_status(range).await?)
    }

    /// Revenue per day with empty days filled in.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn daily_revenue(&self, range: DateRange) -> Result<Vec<DailyRevenue>> {
        let rows = self.repo().daily_revenue(range).await?;
        Ok(fill_days(range, rows))
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn top_products(&self, range: DateRange, limit: Option<i64>) -> Result<Vec<TopProduct>> {
        let limit = limit
            .unwrap_or(DEFAULT_TOP_PRODUCTS)
            .clamp(1, MAX_TOP_PRODUCTS);
        Ok(self.repo().top_products(range, limit).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn funnel(&self, range: DateRange) -> Result<Funnel> {
        let counts = self.repo().sessions_by_kind(range).await?;
        Ok(Funnel {
            range,
            steps: build_funnel(&counts),
        })
    }

    /// Sessions per device class with each class's share.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn devices(&self, range: DateRange) -> Result<Vec<DeviceCount>> {
        let rows = self.repo().sessions_by_device(range).await?;
        let total: i64 = rows.iter().map(|(_, n)| n).sum();
        Ok(rows
            .into_iter()
            .map(|(device, sessions)| DeviceCount {
                device,
                sessions,
                share: percentage(sessions, total),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_resolve_range_rejects_inverted() {
        let query = DateRangeQuery {
            from: NaiveDate::from_ymd_opt(2025, 3, 10),
            to: NaiveDate::from_ymd_opt(2025, 3, 1),
        };
        assert!(matches!(resolve_range(query), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_truncate_path_respects_char_boundaries() {
        assert_eq!(truncate_path("/products/trail-runner"), "/products/trail-runner");

        // 511 ASCII bytes, then a 3-byte character straddling the cap
        let long = format!("/{}€tail", "a".repeat(510));
        let capped = truncate_path(&long);
        assert_eq!(capped.len(), 511);
        assert!(capped.chars().all(|c| c == '/' || c == 'a'));

        let wide = "€".repeat(400);
        let capped = truncate_path(&wide);
        assert!(capped.len() <= MAX_PATH);
        assert_eq!(capped.len(), 510);
    }
}

//! Analytics events and dashboard aggregates.
//!
//! Every revenue figure excludes cancelled orders. Date ranges are inclusive
//! calendar days in UTC.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use stride_core::{AnalyticsEventKind, DeviceType, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::analytics::{DailyRevenue, DateRange, StatusCount, TopProduct};

/// An event to store.
#[derive(Debug)]
pub struct NewEvent<'e> {
    pub kind: AnalyticsEventKind,
    pub path: Option<&'e str>,
    pub product_id: Option<ProductId>,
    pub session_id: &'e str,
    pub user_id: Option<UserId>,
    pub device: DeviceType,
}

#[derive(Debug, sqlx::FromRow)]
struct RevenueRow {
    gross: Decimal,
    orders: i64,
    discounts: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct DailyRow {
    day: NaiveDate,
    revenue: Decimal,
    orders: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TopProductRow {
    product_id: i32,
    name: String,
    units: i64,
    revenue: Decimal,
}

/// Gross revenue, order count and discounts granted in a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueTotals {
    pub gross: Decimal,
    pub orders: i64,
    pub discounts: Decimal,
}

pub struct AnalyticsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, event: &NewEvent<'_>) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO analytics_events (kind, path, product_id, session_id, user_id, device)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.kind)
        .bind(event.path)
        .bind(event.product_id)
        .bind(event.session_id)
        .bind(event.user_id)
        .bind(event.device)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue(&self, range: DateRange) -> Result<RevenueTotals, RepositoryError> {
        let row = sqlx::query_as::<_, RevenueRow>(
            "SELECT COALESCE(SUM(total), 0) AS gross, COUNT(*) AS orders,
                    COALESCE(SUM(discount), 0) AS discounts
             FROM orders
             WHERE status <> 'cancelled'
               AND created_at >= $1::date AND created_at < $2::date + 1",
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_one(self.pool)
        .await?;
        Ok(RevenueTotals {
            gross: row.gross,
            orders: row.orders,
            discounts: row.discounts,
        })
    }

    /// Orders per status in a range, cancelled included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders_by_status(&self, range: DateRange) -> Result<Vec<StatusCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, (OrderStatus, i64)>(
            "SELECT status, COUNT(*) FROM orders
             WHERE created_at >= $1::date AND created_at < $2::date + 1
             GROUP BY status",
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(self.pool)
        .await?;

        // Every status appears, in lifecycle order, so the chart legend is stable.
        Ok(OrderStatus::ALL
            .iter()
            .map(|&status| StatusCount {
                status,
                count: rows
                    .iter()
                    .find(|(s, _)| *s == status)
                    .map_or(0, |(_, c)| *c),
            })
            .collect())
    }

    /// Revenue per day with gaps left out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn daily_revenue(&self, range: DateRange) -> Result<Vec<DailyRevenue>, RepositoryError> {
        let rows = sqlx::query_as::<_, DailyRow>(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                    COALESCE(SUM(total), 0) AS revenue, COUNT(*) AS orders
             FROM orders
             WHERE status <> 'cancelled'
               AND created_at >= $1::date AND created_at < $2::date + 1
             GROUP BY day
             ORDER BY day",
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| DailyRevenue {
                day: r.day,
                revenue: r.revenue,
                orders: r.orders,
            })
            .collect())
    }

    /// Best sellers by units.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_products(
        &self,
        range: DateRange,
        limit: i64,
    ) -> Result<Vec<TopProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, TopProductRow>(
            "SELECT i.product_id, MAX(i.product_name) AS name,
                    SUM(i.quantity)::bigint AS units,
                    SUM(i.quantity * i.unit_price) AS revenue
             FROM order_items i
             JOIN orders o ON o.id = i.order_id
             WHERE o.status <> 'cancelled'
               AND o.created_at >= $1::date AND o.created_at < $2::date + 1
             GROUP BY i.product_id
             ORDER BY units DESC, revenue DESC
             LIMIT $3",
        )
        .bind(range.from)
        .bind(range.to)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| TopProduct {
                product_id: ProductId::new(r.product_id),
                name: r.name,
                units: r.units,
                revenue: r.revenue,
            })
            .collect())
    }

    /// Distinct sessions per event kind, bots excluded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sessions_by_kind(
        &self,
        range: DateRange,
    ) -> Result<Vec<(AnalyticsEventKind, i64)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (AnalyticsEventKind, i64)>(
            "SELECT kind, COUNT(DISTINCT session_id) FROM analytics_events
             WHERE device <> 'bot'
               AND created_at >= $1::date AND created_at < $2::date + 1
             GROUP BY kind",
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Distinct sessions per device class.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sessions_by_device(
        &self,
        range: DateRange,
    ) -> Result<Vec<(DeviceType, i64)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (DeviceType, i64)>(
            "SELECT device, COUNT(DISTINCT session_id) FROM analytics_events
             WHERE created_at >= $1::date AND created_at < $2::date + 1
             GROUP BY device
             ORDER BY 2 DESC",
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

//! Analytics ingestion and dashboard types.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stride_core::analytics::FunnelStep;
use stride_core::{AnalyticsEventKind, DeviceType, OrderStatus, ProductId};

/// Storefront event body.
#[derive(Debug, Deserialize)]
pub struct EventInput {
    pub kind: AnalyticsEventKind,
    pub path: Option<String>,
    pub product_id: Option<ProductId>,
}

/// Inclusive date range for dashboards. Defaults to the last 30 days.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub const DEFAULT_DAYS: i64 = 30;
    pub const MAX_DAYS: i64 = 366;

    /// Resolve a query against `today`.
    ///
    /// # Errors
    ///
    /// Returns a message when `from` is after `to` or the range is too long.
    pub fn resolve(query: DateRangeQuery, today: NaiveDate) -> Result<Self, String> {
        let to = query.to.unwrap_or(today);
        let from = query
            .from
            .unwrap_or_else(|| to - Duration::days(Self::DEFAULT_DAYS - 1));
        if from > to {
            return Err("from must not be after to".to_owned());
        }
        if (to - from).num_days() >= Self::MAX_DAYS {
            return Err(format!("date range must be at most {} days", Self::MAX_DAYS));
        }
        Ok(Self { from, to })
    }

    #[must_use]
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueSummary {
    pub range: DateRange,
    pub gross_revenue: Decimal,
    pub order_count: i64,
    pub average_order_value: Decimal,
    pub discounts: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyRevenue {
    pub day: NaiveDate,
    pub revenue: Decimal,
    pub orders: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub units: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceCount {
    pub device: DeviceType,
    pub sessions: i64,
    pub share: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Funnel {
    pub range: DateRange,
    pub steps: Vec<FunnelStep>,
}

/// Fill days without orders so the chart has a continuous series.
#[must_use]
pub fn fill_days(range: DateRange, rows: Vec<DailyRevenue>) -> Vec<DailyRevenue> {
    let mut out = Vec::new();
    let mut rows = rows.into_iter().peekable();
    let mut day = range.from;
    while day <= range.to {
        match rows.next_if(|r| r.day == day) {
            Some(row) => out.push(row),
            None => out.push(DailyRevenue {
                day,
                revenue: Decimal::ZERO,
                orders: 0,
            }),
        }
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_resolve_defaults_to_thirty_days() {
        let range = DateRange::resolve(DateRangeQuery::default(), date("2025-06-30")).unwrap();
        assert_eq!(range.from, date("2025-06-01"));
        assert_eq!(range.to, date("2025-06-30"));
    }

    #[test]
    fn test_resolve_rejects_inverted_range() {
        let query = DateRangeQuery {
            from: Some(date("2025-06-10")),
            to: Some(date("2025-06-01")),
        };
        assert!(DateRange::resolve(query, date("2025-06-30")).is_err());
    }

    #[test]
    fn test_fill_days() {
        let range = DateRange {
            from: date("2025-06-01"),
            to: date("2025-06-03"),
        };
        let rows = vec![DailyRevenue {
            day: date("2025-06-02"),
            revenue: Decimal::from(500),
            orders: 1,
        }];
        let filled = fill_days(range, rows);
        assert_eq!(filled.len(), 3);
        assert_eq!(filled[0].orders, 0);
        assert_eq!(filled[1].revenue, Decimal::from(500));
        assert_eq!(filled[2].day, date("2025-06-03"));
    }
}

//! Dashboard figures. Every endpoint takes an optional `from`/`to` range and
//! defaults to the last 30 days.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::analytics::{
    DailyRevenue, DateRangeQuery, DeviceCount, Funnel, RevenueSummary, StatusCount, TopProduct,
};
use crate::services::analytics::{AnalyticsService, resolve_range};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TopProductsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

pub async fn summary(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<RevenueSummary>> {
    let range = resolve_range(query)?;
    Ok(Json(AnalyticsService::new(state.pool()).summary(range).await?))
}

pub async fn orders_by_status(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<StatusCount>>> {
    let range = resolve_range(query)?;
    Ok(Json(
        AnalyticsService::new(state.pool())
            .orders_by_status(range)
            .await?,
    ))
}

/// One row per day in the range, zero-filled.
pub async fn daily_revenue(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<DailyRevenue>>> {
    let range = resolve_range(query)?;
    Ok(Json(
        AnalyticsService::new(state.pool())
            .daily_revenue(range)
            .await?,
    ))
}

pub async fn top_products(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<TopProductsQuery>,
) -> Result<Json<Vec<TopProduct>>> {
    let range = resolve_range(DateRangeQuery {
        from: query.from,
        to: query.to,
    })?;
    Ok(Json(
        AnalyticsService::new(state.pool())
            .top_products(range, query.limit)
            .await?,
    ))
}

pub async fn funnel(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Funnel>> {
    let range = resolve_range(query)?;
    Ok(Json(AnalyticsService::new(state.pool()).funnel(range).await?))
}

pub async fn devices(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<DeviceCount>>> {
    let range = resolve_range(query)?;
    Ok(Json(AnalyticsService::new(state.pool()).devices(range).await?))
}

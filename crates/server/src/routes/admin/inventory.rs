//! Stock editing and the movement ledger.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use stride_core::ProductId;

use crate::db::{Page, Pagination};
use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::inventory::{
    InventoryQuery, InventoryRow, ManualMovement, MovementQuery, StockMovement, StockUpdate,
};
use crate::services::inventory::InventoryService;
use crate::state::AppState;

fn service(state: &AppState) -> InventoryService<'_> {
    InventoryService::new(state.pool(), state.config().store.low_stock_threshold)
}

pub async fn index(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> Result<Json<Page<InventoryRow>>> {
    let pagination = Pagination::new(query.page, query.per_page);
    Ok(Json(service(&state).list_inventory(&query, pagination).await?))
}

/// Inline edit. Each changed quantity is logged as a manual adjustment.
pub async fn update(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Json(update): Json<StockUpdate>,
) -> Result<Json<InventoryRow>> {
    let row = service(&state)
        .update_stock(product_id, &update, staff.id)
        .await?;
    Ok(Json(row))
}

pub async fn movements(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<MovementQuery>,
) -> Result<Json<Page<StockMovement>>> {
    let pagination = Pagination::new(query.page, query.per_page);
    Ok(Json(service(&state).list_movements(&query, pagination).await?))
}

/// Record a return or manual adjustment.
pub async fn record_movement(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Json(movement): Json<ManualMovement>,
) -> Result<(StatusCode, Json<InventoryRow>)> {
    let row = service(&state)
        .record_movement(&movement, staff.id)
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

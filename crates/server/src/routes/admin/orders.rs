//! Order management and the Shiprocket shipment flow.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use stride_core::OrderId;

use crate::db::Page;
use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::order::{CancelRequest, Order, OrderQuery, PackageDimensions, StatusUpdate};
use crate::services::orders::OrderService;
use crate::state::AppState;

pub async fn index(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Page<Order>>> {
    Ok(Json(OrderService::new(&state).list(&query).await?))
}

pub async fn show(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(OrderService::new(&state).get(id).await?))
}

/// Move to the next status in the forward sequence.
pub async fn advance(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(OrderService::new(&state).advance(id, staff.id).await?))
}

/// Free-choice status change, validated against the transition table.
pub async fn update_status(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = OrderService::new(&state)
        .update_status(id, update.status, update.reason.as_deref(), staff.id)
        .await?;
    Ok(Json(order))
}

pub async fn cancel(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<Order>> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let order = OrderService::new(&state)
        .cancel_by_staff(id, request.reason.as_deref(), staff.id)
        .await?;
    Ok(Json(order))
}

/// Create the carrier order, assign an AWB and request pickup.
pub async fn create_shipment(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    body: Option<Json<PackageDimensions>>,
) -> Result<Json<Order>> {
    let dimensions = body.map(|Json(d)| d).unwrap_or_default();
    let order = OrderService::new(&state)
        .create_shipment(id, &dimensions)
        .await?;
    Ok(Json(order))
}

pub async fn track(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(OrderService::new(&state).track(id).await?))
}

pub async fn cancel_shipment(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(OrderService::new(&state).cancel_shipment(id).await?))
}

pub async fn generate_label(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(OrderService::new(&state).generate_label(id).await?))
}

//! The signed-in customer's orders.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use stride_core::OrderId;

use crate::db::Page;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::order::{CancelRequest, Order};
use crate::routes::PageQuery;
use crate::services::orders::OrderService;
use crate::state::AppState;

pub async fn index(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Order>>> {
    let page = OrderService::new(&state)
        .list_for_user(user.id, query.pagination())
        .await?;
    Ok(Json(page))
}

pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(OrderService::new(&state).get_for_user(&user, id).await?))
}

/// Customers may cancel until the order is being packed.
pub async fn cancel(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<Order>> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let order = OrderService::new(&state)
        .cancel_by_customer(&user, id, request.reason.as_deref())
        .await?;
    Ok(Json(order))
}

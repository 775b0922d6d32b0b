//! Quote, order placement and online payment verification.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use stride_core::OrderId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::checkout::{
    CheckoutRequest, PaymentVerification, PlacedOrder, Quote, QuoteRequest,
};
use crate::models::order::Order;
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

/// Price the cart (or the given items) without reserving anything.
pub async fn quote(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>> {
    let quote = CheckoutService::new(&state).quote(user.id, request).await?;
    Ok(Json(quote))
}

pub async fn place_order(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let placed = CheckoutService::new(&state)
        .place_order(user.id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

pub async fn verify_payment(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(verification): Json<PaymentVerification>,
) -> Result<Json<Order>> {
    let order = CheckoutService::new(&state)
        .verify_payment(&user, id, &verification)
        .await?;
    Ok(Json(order))
}

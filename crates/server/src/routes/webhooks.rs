//! Carrier webhooks.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use secrecy::ExposeSecret;
use serde::Serialize;

use stride_core::OrderStatus;

use crate::error::{AppError, Result};
use crate::services::orders::OrderService;
use crate::services::payments::constant_time_eq;
use crate::shiprocket::shipments::WebhookPayload;
use crate::state::AppState;

pub const WEBHOOK_TOKEN_HEADER: &str = "x-api-key";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

/// Check the shared token Shiprocket sends with every push.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let expected = state
        .config()
        .shiprocket
        .as_ref()
        .and_then(|c| c.webhook_token.as_ref())
        .ok_or_else(|| {
            AppError::ServiceUnavailable("Shiprocket webhook is not configured".to_string())
        })?;
    let presented = headers
        .get(WEBHOOK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if constant_time_eq(presented, expected.expose_secret()) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("invalid webhook token".to_string()))
    }
}

/// Tracking push. Unknown shipments are acknowledged so the carrier stops
/// retrying them.
pub async fn shiprocket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<WebhookAck>> {
    authenticate(&state, &headers)?;
    let order = OrderService::new(&state).apply_webhook(&payload).await?;
    Ok(Json(WebhookAck {
        matched: order.is_some(),
        status: order.map(|o| o.status),
    }))
}

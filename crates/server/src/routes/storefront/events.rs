//! Storefront analytics events.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::USER_AGENT},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::analytics::EventInput;
use crate::models::session_keys;
use crate::services::analytics::AnalyticsService;
use crate::state::AppState;

/// Anonymous id that groups a visitor's events, issued on first use.
async fn analytics_session(session: &Session) -> Result<String> {
    let existing = session
        .get::<String>(session_keys::ANALYTICS_SESSION)
        .await
        .ok()
        .flatten();
    if let Some(id) = existing {
        return Ok(id);
    }
    let id = Uuid::new_v4().to_string();
    session
        .insert(session_keys::ANALYTICS_SESSION, &id)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    Ok(id)
}

pub async fn record(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Json(input): Json<EventInput>,
) -> Result<StatusCode> {
    let session_id = analytics_session(&session).await?;
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    AnalyticsService::new(state.pool())
        .record(&input, &session_id, user.map(|u| u.id), user_agent)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

//! Expo push token registration.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::notification::{PushToken, PushTokenInput};
use crate::services::notifications::NotificationService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UnregisterRequest {
    pub token: String,
}

/// Register a device. Signed-in users get the token linked to their account.
pub async fn register(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    Json(input): Json<PushTokenInput>,
) -> Result<(StatusCode, Json<PushToken>)> {
    let token = NotificationService::new(&state)
        .register(&input, user.map(|u| u.id))
        .await?;
    Ok((StatusCode::CREATED, Json(token)))
}

pub async fn unregister(
    State(state): State<AppState>,
    Json(request): Json<UnregisterRequest>,
) -> Result<StatusCode> {
    NotificationService::new(&state)
        .unregister(&request.token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

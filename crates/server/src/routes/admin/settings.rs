//! Site settings store.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::settings::{SettingInput, SiteSetting};
use crate::services::content::ContentService;
use crate::state::AppState;

pub async fn index(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<SiteSetting>>> {
    Ok(Json(ContentService::new(&state).settings().await?))
}

/// Upsert one key. Theme colours must be `#rrggbb`.
pub async fn put(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(input): Json<SettingInput>,
) -> Result<Json<SiteSetting>> {
    let setting = ContentService::new(&state)
        .put_setting(&key, input.value, staff.id)
        .await?;
    Ok(Json(setting))
}

pub async fn delete(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode> {
    ContentService::new(&state).delete_setting(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

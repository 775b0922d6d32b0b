use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::db::Page;
use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::notification::{BroadcastRequest, NotificationRecord};
use crate::routes::PageQuery;
use crate::services::notifications::NotificationService;
use crate::state::AppState;

/// Send a push to the chosen audience and record it in the history.
pub async fn broadcast(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Json(request): Json<BroadcastRequest>,
) -> Result<(StatusCode, Json<NotificationRecord>)> {
    let record = NotificationService::new(&state)
        .broadcast(&request, staff.id)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn history(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<NotificationRecord>>> {
    let page = NotificationService::new(&state)
        .history(query.pagination())
        .await?;
    Ok(Json(page))
}

//! Filters, banners and review moderation.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use stride_core::{BannerId, FilterId, ReviewId, ReviewStatus};

use crate::db::Page;
use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::banner::{Banner, BannerInput};
use crate::models::filter::{Filter, FilterInput, ReorderRequest};
use crate::models::review::{Review, ReviewQuery};
use crate::services::content::ContentService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub status: ReviewStatus,
}

pub async fn filters(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Filter>>> {
    Ok(Json(ContentService::new(&state).filters().await?))
}

pub async fn create_filter(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<FilterInput>,
) -> Result<(StatusCode, Json<Filter>)> {
    let filter = ContentService::new(&state).create_filter(input).await?;
    Ok((StatusCode::CREATED, Json(filter)))
}

pub async fn update_filter(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<FilterId>,
    Json(input): Json<FilterInput>,
) -> Result<Json<Filter>> {
    Ok(Json(ContentService::new(&state).update_filter(id, input).await?))
}

pub async fn delete_filter(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<FilterId>,
) -> Result<StatusCode> {
    ContentService::new(&state).delete_filter(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Positions follow the order of `ids`, which must list every filter.
pub async fn reorder_filters(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<Vec<Filter>>> {
    Ok(Json(
        ContentService::new(&state)
            .reorder_filters(&request.ids)
            .await?,
    ))
}

pub async fn banners(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Banner>>> {
    Ok(Json(ContentService::new(&state).banners().await?))
}

pub async fn create_banner(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<BannerInput>,
) -> Result<(StatusCode, Json<Banner>)> {
    let banner = ContentService::new(&state).create_banner(input).await?;
    Ok((StatusCode::CREATED, Json(banner)))
}

pub async fn update_banner(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
    Json(input): Json<BannerInput>,
) -> Result<Json<Banner>> {
    Ok(Json(ContentService::new(&state).update_banner(id, input).await?))
}

pub async fn delete_banner(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
) -> Result<StatusCode> {
    ContentService::new(&state).delete_banner(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_banners(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<Vec<Banner>>> {
    Ok(Json(
        ContentService::new(&state)
            .reorder_banners(&request.ids)
            .await?,
    ))
}

pub async fn reviews(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<Page<Review>>> {
    Ok(Json(ContentService::new(&state).reviews(&query).await?))
}

/// Approve or reject.
pub async fn moderate_review(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    Json(request): Json<ModerationRequest>,
) -> Result<Json<Review>> {
    let review = ContentService::new(&state)
        .moderate_review(id, request.status)
        .await?;
    Ok(Json(review))
}

pub async fn delete_review(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    ContentService::new(&state).delete_review(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

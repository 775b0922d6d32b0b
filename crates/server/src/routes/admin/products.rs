use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use stride_core::ProductId;

use crate::db::Page;
use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::product::{Product, ProductInput, ProductQuery};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Admin listing; inactive products are included unless filtered out.
pub async fn index(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    Ok(Json(CatalogService::new(state.pool()).list(&query, false).await?))
}

pub async fn show(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(CatalogService::new(state.pool()).get(id).await?))
}

pub async fn create(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = CatalogService::new(state.pool())
        .create(input, staff.id)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let product = CatalogService::new(state.pool())
        .update(id, input, staff.id)
        .await?;
    Ok(Json(product))
}

/// Products referenced by orders cannot be deleted; deactivate them instead.
pub async fn delete(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    CatalogService::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

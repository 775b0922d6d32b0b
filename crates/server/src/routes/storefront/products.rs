//! Public catalog: products, categories, filters, banners, site config and
//! review submission.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::db::{Page, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::banner::Banner;
use crate::models::filter::Filter;
use crate::models::product::{Product, ProductDetail, ProductQuery};
use crate::models::review::{Review, ReviewInput};
use crate::models::settings::SiteConfig;
use crate::services::catalog::CatalogService;
use crate::services::content::ContentService;
use crate::state::AppState;

/// Storefront listing. Inactive products are never shown here, whatever the
/// query says.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let page = CatalogService::new(state.pool()).list(&query, true).await?;
    Ok(Json(page))
}

pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    Ok(Json(CatalogService::new(state.pool()).detail(&slug).await?))
}

pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(CatalogService::new(state.pool()).categories().await?))
}

pub async fn filters(State(state): State<AppState>) -> Result<Json<Vec<Filter>>> {
    let filters = ContentService::new(&state).active_filters().await?;
    Ok(Json(filters.as_ref().clone()))
}

pub async fn banners(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    Ok(Json(ContentService::new(&state).live_banners().await?))
}

pub async fn site_config(State(state): State<AppState>) -> Result<Json<SiteConfig>> {
    let config = ContentService::new(&state).site_config().await?;
    Ok(Json(config.as_ref().clone()))
}

/// Submit a review. It stays pending until a moderator approves it.
pub async fn submit_review(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(input): Json<ReviewInput>,
) -> Result<(StatusCode, Json<Review>)> {
    let product = ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
    let review = ContentService::new(&state)
        .submit_review(product.id, user.id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use stride_core::CouponId;

use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::coupon::{Coupon, CouponInput};
use crate::services::coupons::CouponService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DeleteOutcome {
    /// `false` when the coupon had been used and was deactivated instead.
    pub deleted: bool,
}

pub async fn index(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(CouponService::new(state.pool()).list().await?))
}

pub async fn create(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<CouponInput>,
) -> Result<(StatusCode, Json<Coupon>)> {
    let coupon = CouponService::new(state.pool()).create(input).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn update(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<CouponId>,
    Json(input): Json<CouponInput>,
) -> Result<Json<Coupon>> {
    Ok(Json(CouponService::new(state.pool()).update(id, input).await?))
}

pub async fn delete(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<CouponId>,
) -> Result<Json<DeleteOutcome>> {
    let deleted = CouponService::new(state.pool()).delete(id).await?;
    Ok(Json(DeleteOutcome { deleted }))
}

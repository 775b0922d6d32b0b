use axum::{Json, extract::State};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::coupon::{CouponValidation, ValidateCouponRequest};
use crate::services::coupons::CouponService;
use crate::state::AppState;

/// Check a code against a subtotal. A rejected code is a `200` with
/// `valid: false` and the reason.
pub async fn validate(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<Json<CouponValidation>> {
    let validation = CouponService::new(state.pool())
        .validate(&request.code, request.subtotal, user.id)
        .await?;
    Ok(Json(validation))
}

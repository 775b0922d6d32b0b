//! Coupon administration and checkout validation.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use stride_core::coupon::{CouponRejection, normalize_code};
use stride_core::{CouponId, UserId};

use crate::db::{CouponRepository, OrderRepository};
use crate::error::Result;
use crate::models::coupon::{Coupon, CouponInput, CouponValidation};

pub struct CouponService<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>> {
        Ok(CouponRepository::new(self.pool).list().await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::InvalidCoupon` for a bad definition and a conflict
    /// for a duplicate code.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, mut input: CouponInput) -> Result<Coupon> {
        prepare(&mut input)?;
        let coupon = CouponRepository::new(self.pool).create(&input).await?;
        tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");
        Ok(coupon)
    }

    /// # Errors
    ///
    /// Returns `AppError::InvalidCoupon` for a bad definition and
    /// `AppError::Database` with `NotFound` for an unknown coupon.
    #[instrument(skip(self, input), fields(coupon_id = %id))]
    pub async fn update(&self, id: CouponId, mut input: CouponInput) -> Result<Coupon> {
        prepare(&mut input)?;
        Ok(CouponRepository::new(self.pool).update(id, &input).await?)
    }

    /// Delete a coupon. A coupon already used by orders is deactivated
    /// instead; the return value says which happened.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` with `NotFound` for an unknown coupon.
    pub async fn delete(&self, id: CouponId) -> Result<bool> {
        let deleted = CouponRepository::new(self.pool).delete(id).await?;
        if deleted {
            tracing::info!(coupon_id = %id, "Coupon deleted");
        } else {
            tracing::info!(coupon_id = %id, "Coupon in use, deactivated instead");
        }
        Ok(deleted)
    }

    /// Check a code against a subtotal for a customer.
    ///
    /// A rejection is part of the successful answer; only infrastructure
    /// failures are errors.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn validate(
        &self,
        code: &str,
        subtotal: Decimal,
        user: UserId,
    ) -> Result<CouponValidation> {
        let code = normalize_code(code);
        let mut conn = self.pool.acquire().await?;
        let outcome = evaluate(&mut conn, &code, subtotal, user, false)
            .await?
            .map(|(_, discount)| discount);
        Ok(CouponValidation::from_outcome(code, outcome))
    }
}

/// Normalize and check a definition before it is written.
fn prepare(input: &mut CouponInput) -> Result<()> {
    input.code = normalize_code(&input.code);
    input.description = input.description.trim().to_owned();
    input.rules().check_definition(&input.code)?;
    Ok(())
}

/// Look up and evaluate a coupon on an open connection.
///
/// With `lock` the coupon row is held until the surrounding transaction
/// ends so the usage count cannot race.
///
/// # Errors
///
/// Returns `AppError::Database` if a query fails. Business rejections are
/// returned in the inner `Result`.
pub async fn evaluate(
    conn: &mut PgConnection,
    code: &str,
    subtotal: Decimal,
    user: UserId,
    lock: bool,
) -> Result<std::result::Result<(Coupon, Decimal), CouponRejection>> {
    let Some(coupon) = CouponRepository::find_by_code(conn, code, lock).await? else {
        return Ok(Err(CouponRejection::Unknown));
    };
    let uses = OrderRepository::coupon_uses(conn, coupon.id, user).await?;
    Ok(coupon
        .rules()
        .evaluate(subtotal, Utc::now(), uses)
        .map(|discount| (coupon, discount)))
}

#[cfg(test)]
mod tests {
    use stride_core::CouponKind;
    use stride_core::coupon::InvalidCoupon;

    use super::*;
    use crate::error::AppError;

    fn input(code: &str, kind: CouponKind, value: i64) -> CouponInput {
        CouponInput {
            code: code.to_owned(),
            description: "  ".to_owned(),
            kind,
            value: Decimal::from(value),
            min_order_amount: None,
            max_discount: None,
            usage_limit: None,
            per_user_limit: None,
            starts_at: None,
            expires_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_prepare_normalizes_code() {
        let mut coupon = input("  summer10 ", CouponKind::Percentage, 10);
        assert!(prepare(&mut coupon).is_ok());
        assert_eq!(coupon.code, "SUMMER10");
        assert_eq!(coupon.description, "");
    }

    #[test]
    fn test_prepare_rejects_bad_percentage() {
        let mut coupon = input("HALFPLUS", CouponKind::Percentage, 150);
        assert!(matches!(
            prepare(&mut coupon),
            Err(AppError::InvalidCoupon(InvalidCoupon::Percentage))
        ));
    }
}

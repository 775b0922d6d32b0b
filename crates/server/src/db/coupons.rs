//! Coupon repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use stride_core::{CouponId, CouponKind};

use super::RepositoryError;
use crate::models::coupon::{Coupon, CouponInput};

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: i32,
    code: String,
    description: String,
    kind: CouponKind,
    value: Decimal,
    min_order_amount: Option<Decimal>,
    max_discount: Option<Decimal>,
    usage_limit: Option<i32>,
    per_user_limit: Option<i32>,
    used_count: i32,
    starts_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Self {
            id: CouponId::new(row.id),
            code: row.code,
            description: row.description,
            kind: row.kind,
            value: row.value,
            min_order_amount: row.min_order_amount,
            max_discount: row.max_discount,
            usage_limit: row.usage_limit,
            per_user_limit: row.per_user_limit,
            used_count: row.used_count,
            starts_at: row.starts_at,
            expires_at: row.expires_at,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, code, description, kind, value, min_order_amount, max_discount, \
     usage_limit, per_user_limit, used_count, starts_at, expires_at, is_active, created_at, \
     updated_at";

/// Repository for discount codes.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COLUMNS} FROM coupons ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!("SELECT {COLUMNS} FROM coupons WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Look up a coupon by normalized code, locking it when `for_update`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(
        conn: &mut PgConnection,
        code: &str,
        for_update: bool,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COLUMNS} FROM coupons WHERE code = $1{lock}"
        ))
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "INSERT INTO coupons
                (code, description, kind, value, min_order_amount, max_discount, usage_limit,
                 per_user_limit, starts_at, expires_at, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        ))
        .bind(&input.code)
        .bind(&input.description)
        .bind(input.kind)
        .bind(input.value)
        .bind(input.min_order_amount)
        .bind(input.max_discount)
        .bind(input.usage_limit)
        .bind(input.per_user_limit)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "coupon code already exists"))?;
        Ok(row.into())
    }

    /// Update a coupon's rules. The usage count is preserved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist, or
    /// `RepositoryError::Conflict` if the new code is taken.
    pub async fn update(&self, id: CouponId, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "UPDATE coupons
             SET code = $2, description = $3, kind = $4, value = $5, min_order_amount = $6,
                 max_discount = $7, usage_limit = $8, per_user_limit = $9, starts_at = $10,
                 expires_at = $11, is_active = $12, updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&input.code)
        .bind(&input.description)
        .bind(input.kind)
        .bind(input.value)
        .bind(input.min_order_amount)
        .bind(input.max_discount)
        .bind(input.usage_limit)
        .bind(input.per_user_limit)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "coupon code already exists"))?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// Delete an unused coupon; used coupons are deactivated instead.
    ///
    /// Returns `true` when the row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    pub async fn delete(&self, id: CouponId) -> Result<bool, RepositoryError> {
        let deleted = sqlx::query(
            "DELETE FROM coupons WHERE id = $1
             AND NOT EXISTS (SELECT 1 FROM orders WHERE coupon_id = $1)",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        if deleted.rows_affected() > 0 {
            return Ok(true);
        }

        let deactivated =
            sqlx::query("UPDATE coupons SET is_active = FALSE, updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(self.pool)
                .await?;
        if deactivated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(false)
    }

    /// Count a use. Fails with `Conflict` if the global limit is reached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when no uses remain.
    pub async fn consume(conn: &mut PgConnection, id: CouponId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE coupons SET used_count = used_count + 1, updated_at = now()
             WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "coupon usage limit reached".to_owned(),
            ));
        }
        Ok(())
    }

    /// Give back a use when an order is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn release(conn: &mut PgConnection, id: CouponId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE coupons SET used_count = GREATEST(used_count - 1, 0), updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Coupon applied to an order, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_order(
        conn: &mut PgConnection,
        order_id: stride_core::OrderId,
    ) -> Result<Option<CouponId>, RepositoryError> {
        let id: Option<Option<i32>> =
            sqlx::query_scalar("SELECT coupon_id FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(id.flatten().map(CouponId::new))
    }
}

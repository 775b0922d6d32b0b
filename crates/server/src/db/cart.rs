//! Server-side cart repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use stride_core::{CartItemId, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::{CartItem, CartItemInput};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    product_id: i32,
    product_name: String,
    slug: String,
    image: Option<String>,
    size: Option<String>,
    color: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    available: i32,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            slug: row.slug,
            image: row.image,
            size: row.size,
            color: row.color,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.unit_price * Decimal::from(row.quantity),
            available: row.available,
        }
    }
}

/// Cart lines joined with live catalog data.
const SELECT: &str = "SELECT c.id, c.product_id, p.name AS product_name, p.slug, \
     p.images[1] AS image, c.size, c.color, c.quantity, p.price AS unit_price, \
     CASE \
         WHEN p.out_of_stock OR NOT p.is_active THEN 0 \
         WHEN c.size IS NULL THEN p.stock \
         ELSE COALESCE(s.stock, 0) \
     END AS available \
     FROM cart_items c \
     JOIN products p ON p.id = c.product_id \
     LEFT JOIN product_sizes s ON s.product_id = c.product_id AND s.size = c.size \
     WHERE c.user_id = $1";

pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartRow>(&format!("{SELECT} ORDER BY c.id"))
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add a line, merging with an identical product/size/color line.
    ///
    /// Returns the resulting quantity of the line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn add(&self, user_id: UserId, item: &CartItemInput) -> Result<i32, RepositoryError> {
        let quantity = sqlx::query_scalar(
            "INSERT INTO cart_items (user_id, product_id, size, color, quantity)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id, product_id, size, color) DO UPDATE
             SET quantity = cart_items.quantity + EXCLUDED.quantity
             RETURNING quantity",
        )
        .bind(user_id)
        .bind(item.product_id)
        .bind(item.size.as_deref())
        .bind(item.color.as_deref())
        .bind(item.quantity)
        .fetch_one(self.pool)
        .await?;
        Ok(quantity)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .bind(quantity)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn remove(&self, user_id: UserId, id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

//! Inventory service: stock edits and the movement ledger.
//!
//! Every quantity change goes through this module so that the stock update
//! and its ledger entry are written in the same transaction.

use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use stride_core::inventory::{
    SizeStock, StockError, StockLevel, apply_delta, plan_aggregate_adjustment,
    plan_size_adjustments,
};
use stride_core::{MovementType, OrderId, ProductId, UserId};

use crate::db::{Page, Pagination, ProductRepository, RepositoryError, StockMovementRepository};
use crate::error::{AppError, Result};
use crate::models::inventory::{
    InventoryQuery, InventoryRow, ManualMovement, MovementQuery, NewMovement, StockMovement,
    StockUpdate,
};
use crate::models::non_blank;
use crate::models::order::Order;
use crate::models::product::Product;

/// Build the inventory table row for a product.
#[must_use]
pub fn inventory_row(product: Product, low_threshold: i32) -> InventoryRow {
    let level = StockLevel::classify(product.stock, low_threshold, product.out_of_stock);
    let low_sizes = product
        .sizes
        .iter()
        .filter(|s| s.stock <= low_threshold)
        .map(|s| s.size.clone())
        .collect();
    InventoryRow {
        product_id: product.id,
        name: product.name,
        slug: product.slug,
        category: product.category,
        stock: product.stock,
        sizes: product.sizes,
        out_of_stock: product.out_of_stock,
        is_active: product.is_active,
        level,
        low_sizes,
    }
}

/// Who caused a stock change, and why.
#[derive(Debug, Clone, Copy)]
pub struct MovementContext<'a> {
    pub movement_type: MovementType,
    pub actor: Option<UserId>,
    pub order_id: Option<OrderId>,
    pub note: Option<&'a str>,
}

impl<'a> MovementContext<'a> {
    #[must_use]
    pub const fn manual(actor: UserId, note: Option<&'a str>) -> Self {
        Self {
            movement_type: MovementType::ManualAdjustment,
            actor: Some(actor),
            order_id: None,
            note,
        }
    }

    pub(crate) fn entry(&self, product_id: ProductId, size: Option<String>, delta: i32, resulting: i32) -> NewMovement {
        NewMovement {
            product_id,
            size,
            movement_type: self.movement_type,
            quantity: delta,
            resulting_stock: resulting,
            note: self.note.map(str::to_owned),
            order_id: self.order_id,
            actor_id: self.actor,
        }
    }
}

/// Inventory service.
pub struct InventoryService<'a> {
    pool: &'a PgPool,
    low_threshold: i32,
}

impl<'a> InventoryService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, low_threshold: i32) -> Self {
        Self {
            pool,
            low_threshold,
        }
    }

    /// Inventory table with stock levels.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_inventory(
        &self,
        query: &InventoryQuery,
        pagination: Pagination,
    ) -> Result<Page<InventoryRow>> {
        let page = ProductRepository::new(self.pool)
            .list_inventory(query, self.low_threshold, pagination)
            .await?;
        Ok(page.map(|p| inventory_row(p, self.low_threshold)))
    }

    /// Ledger view.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_movements(
        &self,
        query: &MovementQuery,
        pagination: Pagination,
    ) -> Result<Page<StockMovement>> {
        Ok(StockMovementRepository::new(self.pool)
            .list(query, pagination)
            .await?)
    }

    /// Inline stock edit from the inventory table.
    ///
    /// Quantities are absolute targets; each change is logged as a
    /// `manual_adjustment` with the delta.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an empty edit or an edit that does
    /// not fit the product, and `AppError::Stock` for invalid quantities.
    #[instrument(skip(self, update), fields(product_id = %product_id))]
    pub async fn update_stock(
        &self,
        product_id: ProductId,
        update: &StockUpdate,
        actor: UserId,
    ) -> Result<InventoryRow> {
        if update.is_empty() {
            return Err(AppError::BadRequest("nothing to update".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let product = ProductRepository::find(&mut tx, product_id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let note = non_blank(update.note.clone());
        let ctx = MovementContext::manual(actor, note.as_deref());

        if !update.sizes.is_empty() {
            if !product.has_sizes() {
                return Err(AppError::BadRequest(
                    "product has no sizes; edit its stock instead".to_string(),
                ));
            }
            if let Some(unknown) = update
                .sizes
                .iter()
                .find(|t| !product.sizes.iter().any(|s| s.size == t.size.trim()))
            {
                return Err(StockError::UnknownSize(unknown.size.clone()).into());
            }
            apply_size_targets(&mut tx, &product, &update.sizes, &ctx).await?;
        }

        if let Some(stock) = update.stock {
            if product.has_sizes() {
                return Err(AppError::BadRequest(
                    "stock of a sized product is the sum of its sizes".to_string(),
                ));
            }
            apply_stock_target(&mut tx, &product, stock, &ctx).await?;
        }

        if let Some(out_of_stock) = update.out_of_stock {
            ProductRepository::set_out_of_stock(&mut tx, product_id, out_of_stock).await?;
        }

        let updated = ProductRepository::find(&mut tx, product_id, false)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        tracing::info!(product_id = %product_id, stock = updated.stock, "Stock updated");
        Ok(inventory_row(updated, self.low_threshold))
    }

    /// Record a hand-entered `return` or `manual_adjustment`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for automatic movement types and
    /// `AppError::Stock` when the delta is invalid or would go negative.
    #[instrument(skip(self, movement), fields(product_id = %movement.product_id))]
    pub async fn record_movement(
        &self,
        movement: &ManualMovement,
        actor: UserId,
    ) -> Result<InventoryRow> {
        check_manual_movement(movement)?;

        let mut tx = self.pool.begin().await?;
        let product = ProductRepository::find(&mut tx, movement.product_id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let size = movement
            .size
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let current = match (product.has_sizes(), size) {
            (true, Some(size)) => product
                .sizes
                .iter()
                .find(|s| s.size == size)
                .map(|s| s.stock)
                .ok_or_else(|| StockError::UnknownSize(size.to_owned()))?,
            (true, None) => {
                return Err(AppError::BadRequest(
                    "size is required for this product".to_string(),
                ));
            }
            (false, Some(size)) => return Err(StockError::UnknownSize(size.to_owned()).into()),
            (false, None) => product.stock,
        };
        let resulting = apply_delta(current, movement.quantity)?;

        match size {
            Some(size) => {
                ProductRepository::set_size_stock(&mut tx, product.id, size, resulting).await?;
            }
            None => ProductRepository::set_stock(&mut tx, product.id, resulting).await?,
        }

        let note = non_blank(movement.note.clone());
        let ctx = MovementContext {
            movement_type: movement.movement_type,
            actor: Some(actor),
            order_id: None,
            note: note.as_deref(),
        };
        StockMovementRepository::insert(
            &mut tx,
            &ctx.entry(product.id, size.map(str::to_owned), movement.quantity, resulting),
        )
        .await?;

        let updated = ProductRepository::find(&mut tx, product.id, false)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;
        Ok(inventory_row(updated, self.low_threshold))
    }
}

/// Validate a hand-entered movement before touching the database.
///
/// # Errors
///
/// Returns an error for automatic types, zero deltas and negative returns.
pub fn check_manual_movement(movement: &ManualMovement) -> Result<()> {
    if !movement.movement_type.is_manual() {
        return Err(AppError::BadRequest(format!(
            "{} movements are recorded automatically",
            movement.movement_type
        )));
    }
    if movement.quantity == 0 {
        return Err(StockError::ZeroDelta.into());
    }
    if movement.movement_type == MovementType::Return && movement.quantity < 0 {
        return Err(StockError::InvalidQuantity.into());
    }
    Ok(())
}

/// Set per-size targets and log one movement per changed size.
///
/// # Errors
///
/// Returns `AppError::Stock` for invalid targets.
pub async fn apply_size_targets(
    conn: &mut PgConnection,
    product: &Product,
    targets: &[SizeStock],
    ctx: &MovementContext<'_>,
) -> Result<()> {
    for adjustment in plan_size_adjustments(&product.sizes, targets)? {
        let Some(size) = adjustment.size else {
            continue;
        };
        ProductRepository::set_size_stock(conn, product.id, &size, adjustment.resulting).await?;
        StockMovementRepository::insert(
            conn,
            &ctx.entry(product.id, Some(size), adjustment.delta, adjustment.resulting),
        )
        .await?;
    }
    Ok(())
}

/// Set the aggregate stock of a product without sizes and log the change.
///
/// # Errors
///
/// Returns `AppError::Stock` for a negative target.
pub async fn apply_stock_target(
    conn: &mut PgConnection,
    product: &Product,
    target: i32,
    ctx: &MovementContext<'_>,
) -> Result<()> {
    if let Some(adjustment) = plan_aggregate_adjustment(product.stock, target)? {
        ProductRepository::set_stock(conn, product.id, adjustment.resulting).await?;
        StockMovementRepository::insert(
            conn,
            &ctx.entry(product.id, None, adjustment.delta, adjustment.resulting),
        )
        .await?;
    }
    Ok(())
}

/// Replace a product's size list: listed sizes get their target stock,
/// unlisted sizes are zeroed (with a movement) and removed.
///
/// # Errors
///
/// Returns `AppError::Stock` for invalid targets.
pub async fn replace_sizes(
    conn: &mut PgConnection,
    product: &Product,
    desired: &[SizeStock],
    ctx: &MovementContext<'_>,
) -> Result<()> {
    let removed: Vec<SizeStock> = product
        .sizes
        .iter()
        .filter(|s| s.stock != 0 && !desired.iter().any(|d| d.size == s.size))
        .map(|s| SizeStock {
            size: s.size.clone(),
            stock: 0,
        })
        .collect();

    let mut targets = desired.to_vec();
    targets.extend(removed);
    apply_size_targets(conn, product, &targets, ctx).await?;

    let keep: Vec<String> = desired.iter().map(|s| s.size.clone()).collect();
    ProductRepository::remove_sizes_except(conn, product.id, &keep).await?;
    Ok(())
}

/// Return every line of an order to stock with one movement per line.
///
/// # Errors
///
/// Returns `AppError::Database` if a write fails.
pub async fn restock_order(
    conn: &mut PgConnection,
    order: &Order,
    ctx: &MovementContext<'_>,
) -> Result<()> {
    for item in &order.items {
        let resulting =
            ProductRepository::restore_stock(conn, item.product_id, item.size.as_deref(), item.quantity)
                .await?;
        StockMovementRepository::insert(
            conn,
            &ctx.entry(item.product_id, item.size.clone(), item.quantity, resulting),
        )
        .await?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn product(stock: i32, sizes: &[(&str, i32)], out_of_stock: bool) -> Product {
        Product {
            id: ProductId::new(3),
            name: "Court Classic".to_owned(),
            slug: "court-classic".to_owned(),
            description: String::new(),
            category: "sneakers".to_owned(),
            price: Decimal::from(2999),
            compare_at_price: None,
            stock,
            sizes: sizes
                .iter()
                .map(|(s, n)| SizeStock {
                    size: (*s).to_owned(),
                    stock: *n,
                })
                .collect(),
            colors: vec![],
            images: vec![],
            is_active: true,
            is_featured: false,
            out_of_stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_inventory_row_flags_low_sizes() {
        let row = inventory_row(product(23, &[("8", 20), ("9", 3), ("10", 0)], false), 5);
        assert_eq!(row.level, StockLevel::InStock);
        assert_eq!(row.low_sizes, vec!["9".to_owned(), "10".to_owned()]);
        assert!(row.is_low());
    }

    #[test]
    fn test_inventory_row_override() {
        let row = inventory_row(product(50, &[], true), 5);
        assert_eq!(row.level, StockLevel::OutOfStock);
    }

    fn movement(movement_type: MovementType, quantity: i32) -> ManualMovement {
        ManualMovement {
            product_id: ProductId::new(3),
            size: None,
            movement_type,
            quantity,
            note: None,
        }
    }

    #[test]
    fn test_check_manual_movement() {
        assert!(check_manual_movement(&movement(MovementType::Return, 2)).is_ok());
        assert!(check_manual_movement(&movement(MovementType::ManualAdjustment, -4)).is_ok());
        assert!(matches!(
            check_manual_movement(&movement(MovementType::Sale, -1)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            check_manual_movement(&movement(MovementType::ManualAdjustment, 0)),
            Err(AppError::Stock(StockError::ZeroDelta))
        ));
        assert!(matches!(
            check_manual_movement(&movement(MovementType::Return, -1)),
            Err(AppError::Stock(StockError::InvalidQuantity))
        ));
    }

    #[test]
    fn test_movement_context_entry() {
        let ctx = MovementContext {
            movement_type: MovementType::Cancellation,
            actor: None,
            order_id: Some(OrderId::new(9)),
            note: Some("customer changed mind"),
        };
        let entry = ctx.entry(ProductId::new(3), Some("9".to_owned()), 2, 7);
        assert_eq!(entry.quantity, 2);
        assert_eq!(entry.resulting_stock, 7);
        assert_eq!(entry.order_id, Some(OrderId::new(9)));
        assert_eq!(entry.note.as_deref(), Some("customer changed mind"));
    }
}

//! Append-only stock ledger.
//!
//! Entries are only ever inserted; there is no update or delete.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use stride_core::{MovementType, OrderId, ProductId, StockMovementId, UserId};

use super::{Page, Pagination, RepositoryError};
use crate::models::inventory::{MovementQuery, NewMovement, StockMovement};

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: i32,
    product_id: i32,
    product_name: String,
    size: Option<String>,
    movement_type: MovementType,
    quantity: i32,
    resulting_stock: i32,
    note: Option<String>,
    order_id: Option<i32>,
    actor_id: Option<i32>,
    actor_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MovementRow> for StockMovement {
    fn from(row: MovementRow) -> Self {
        Self {
            id: StockMovementId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            size: row.size,
            movement_type: row.movement_type,
            quantity: row.quantity,
            resulting_stock: row.resulting_stock,
            note: row.note,
            order_id: row.order_id.map(OrderId::new),
            actor_id: row.actor_id.map(UserId::new),
            actor_name: row.actor_name,
            created_at: row.created_at,
        }
    }
}

const SELECT: &str = "SELECT m.id, m.product_id, p.name AS product_name, m.size, m.movement_type, \
     m.quantity, m.resulting_stock, m.note, m.order_id, m.actor_id, u.name AS actor_name, \
     m.created_at \
     FROM stock_movements m \
     JOIN products p ON p.id = m.product_id \
     LEFT JOIN users u ON u.id = m.actor_id \
     WHERE TRUE";

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &MovementQuery) {
    if let Some(product_id) = query.product_id {
        qb.push(" AND m.product_id = ").push_bind(product_id);
    }
    if let Some(kind) = query.movement_type {
        qb.push(" AND m.movement_type = ").push_bind(kind);
    }
    if let Some(order_id) = query.order_id {
        qb.push(" AND m.order_id = ").push_bind(order_id);
    }
    if let Some(from) = query.from {
        qb.push(" AND m.created_at >= ").push_bind(from).push("::date");
    }
    if let Some(to) = query.to {
        qb.push(" AND m.created_at < ")
            .push_bind(to)
            .push("::date + 1");
    }
}

/// Repository for stock movements.
pub struct StockMovementRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StockMovementRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry on the caller's connection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        conn: &mut PgConnection,
        movement: &NewMovement,
    ) -> Result<StockMovementId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO stock_movements
                (product_id, size, movement_type, quantity, resulting_stock, note, order_id, actor_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(movement.product_id)
        .bind(movement.size.as_deref())
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(movement.resulting_stock)
        .bind(movement.note.as_deref())
        .bind(movement.order_id)
        .bind(movement.actor_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(StockMovementId::new(id))
    }

    /// Ledger view, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        query: &MovementQuery,
        pagination: Pagination,
    ) -> Result<Page<StockMovement>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM stock_movements m WHERE TRUE",
        );
        push_filters(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(SELECT);
        push_filters(&mut qb, query);
        qb.push(" ORDER BY m.created_at DESC, m.id DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        let rows = qb.build_query_as::<MovementRow>().fetch_all(self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            total,
            pagination,
        ))
    }

    /// All entries written for an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_order(&self, order_id: OrderId) -> Result<Vec<StockMovement>, RepositoryError> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            "{SELECT} AND m.order_id = $1 ORDER BY m.id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

//! Order repository.
//!
//! Orders are never deleted. Mutations that must stay consistent with stock
//! (placing, cancelling, failed payment) take a connection so the caller's
//! transaction covers them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use stride_core::order::{OrderTotals, order_number};
use stride_core::{
    CouponId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
};

use super::{Page, Pagination, RepositoryError, like_pattern};
use crate::models::order::{
    Cancellation, NewOrder, Order, OrderItem, OrderQuery, PaymentInfo, ShipmentInfo,
    ShippingAddress, TrackingEvent,
};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    customer_name: Option<String>,
    customer_email: Option<String>,
    status: OrderStatus,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    payment_gateway_order_id: Option<String>,
    payment_transaction_id: Option<String>,
    shipping_address: Json<ShippingAddress>,
    subtotal: Decimal,
    discount: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    coupon_code: Option<String>,
    shiprocket_order_id: Option<i64>,
    shiprocket_shipment_id: Option<i64>,
    awb_code: Option<String>,
    courier_name: Option<String>,
    tracking_url: Option<String>,
    label_url: Option<String>,
    tracking_history: Json<Vec<TrackingEvent>>,
    cancel_reason: Option<String>,
    cancelled_by: Option<i32>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        let id = OrderId::new(self.id);
        let cancellation = self.cancelled_at.map(|cancelled_at| Cancellation {
            reason: self.cancel_reason.unwrap_or_default(),
            cancelled_by: self.cancelled_by.map(UserId::new),
            cancelled_at,
        });
        Order {
            id,
            order_number: order_number(id),
            user_id: UserId::new(self.user_id),
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            status: self.status,
            payment: PaymentInfo {
                method: self.payment_method,
                status: self.payment_status,
                gateway_order_id: self.payment_gateway_order_id,
                transaction_id: self.payment_transaction_id,
            },
            shipping_address: self.shipping_address.0,
            shipment: ShipmentInfo {
                shiprocket_order_id: self.shiprocket_order_id,
                shipment_id: self.shiprocket_shipment_id,
                awb_code: self.awb_code,
                courier_name: self.courier_name,
                tracking_url: self.tracking_url,
                label_url: self.label_url,
                tracking_history: self.tracking_history.0,
            },
            items,
            totals: OrderTotals {
                subtotal: self.subtotal,
                discount: self.discount,
                shipping: self.shipping_cost,
                total: self.total,
            },
            coupon_code: self.coupon_code,
            cancellation,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    product_name: String,
    size: Option<String>,
    color: Option<String>,
    quantity: i32,
    unit_price: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            size: row.size,
            color: row.color,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.unit_price * Decimal::from(row.quantity),
        }
    }
}

const SELECT: &str = "SELECT o.id, o.user_id, u.name AS customer_name, u.email AS customer_email, \
     o.status, o.payment_method, o.payment_status, o.payment_gateway_order_id, \
     o.payment_transaction_id, o.shipping_address, o.subtotal, o.discount, o.shipping_cost, \
     o.total, o.coupon_code, o.shiprocket_order_id, o.shiprocket_shipment_id, o.awb_code, \
     o.courier_name, o.tracking_url, o.label_url, o.tracking_history, o.cancel_reason, \
     o.cancelled_by, o.cancelled_at, o.created_at, o.updated_at \
     FROM orders o LEFT JOIN users u ON u.id = o.user_id WHERE TRUE";

/// Parse `STR000042` (any case) or a bare number into an order id.
fn parse_order_number(search: &str) -> Option<i32> {
    let trimmed = search.trim();
    let digits = trimmed
        .get(..3)
        .filter(|prefix| prefix.eq_ignore_ascii_case("str"))
        .and_then(|_| trimmed.get(3..))
        .unwrap_or(trimmed);
    digits.parse().ok()
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &OrderQuery) {
    if let Some(status) = query.status {
        qb.push(" AND o.status = ").push_bind(status);
    }
    if let Some(payment_status) = query.payment_status {
        qb.push(" AND o.payment_status = ").push_bind(payment_status);
    }
    if let Some(from) = query.from {
        qb.push(" AND o.created_at >= ").push_bind(from).push("::date");
    }
    if let Some(to) = query.to {
        qb.push(" AND o.created_at < ").push_bind(to).push("::date + 1");
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (u.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR o.awb_code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR o.shipping_address->>'phone' ILIKE ")
            .push_bind(pattern);
        if let Some(id) = parse_order_number(search) {
            qb.push(" OR o.id = ").push_bind(id);
        }
        qb.push(")");
    }
}

/// Repository for orders and their items.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn attach_items(
        conn: &mut PgConnection,
        rows: Vec<OrderRow>,
    ) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, product_name, size, color, quantity, unit_price
             FROM order_items WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (own, rest): (Vec<_>, Vec<_>) =
                    items.drain(..).partition(|item| item.order_id == row.id);
                items = rest;
                row.into_order(own.into_iter().map(Into::into).collect())
            })
            .collect())
    }

    /// Insert an order with its items. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn insert(conn: &mut PgConnection, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        let payment_status = PaymentStatus::Pending;
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO orders
                (user_id, status, payment_method, payment_status, payment_gateway_order_id,
                 shipping_address, subtotal, discount, shipping_cost, total, coupon_id, coupon_code)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING id",
        )
        .bind(order.user_id)
        .bind(order.status)
        .bind(order.payment_method)
        .bind(payment_status)
        .bind(order.gateway_order_id.as_deref())
        .bind(Json(&order.shipping_address))
        .bind(order.totals.subtotal)
        .bind(order.totals.discount)
        .bind(order.totals.shipping)
        .bind(order.totals.total)
        .bind(order.coupon_id)
        .bind(order.coupon_code.as_deref())
        .fetch_one(&mut *conn)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items
                    (order_id, product_id, product_name, size, color, quantity, unit_price)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.size.as_deref())
            .bind(item.color.as_deref())
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *conn)
            .await?;
        }

        Ok(OrderId::new(id))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id, false).await
    }

    /// Load an order, optionally locking its row for the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(
        conn: &mut PgConnection,
        id: OrderId,
        for_update: bool,
    ) -> Result<Option<Order>, RepositoryError> {
        // FOR UPDATE cannot apply to the nullable side of the user join.
        let lock = if for_update { " FOR UPDATE OF o" } else { "" };
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT} AND o.id = $1{lock}"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(Self::attach_items(conn, row.into_iter().collect())
            .await?
            .into_iter()
            .next())
    }

    /// Find the order a carrier AWB or Shiprocket order id belongs to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_shipment(
        &self,
        awb_code: Option<&str>,
        shiprocket_order_id: Option<i64>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT} AND ((o.awb_code IS NOT NULL AND o.awb_code = $1)
                 OR (o.shiprocket_order_id IS NOT NULL AND o.shiprocket_order_id = $2))
             ORDER BY o.id DESC LIMIT 1"
        ))
        .bind(awb_code)
        .bind(shiprocket_order_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(Self::attach_items(&mut conn, row.into_iter().collect())
            .await?
            .into_iter()
            .next())
    }

    /// Admin listing, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        query: &OrderQuery,
        pagination: Pagination,
    ) -> Result<Page<Order>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM orders o LEFT JOIN users u ON u.id = o.user_id WHERE TRUE",
        );
        push_filters(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(SELECT);
        push_filters(&mut qb, query);
        qb.push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let mut conn = self.pool.acquire().await?;
        let rows = qb.build_query_as::<OrderRow>().fetch_all(&mut *conn).await?;
        let items = Self::attach_items(&mut conn, rows).await?;
        Ok(Page::new(items, total, pagination))
    }

    /// A customer's order history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        pagination: Pagination,
    ) -> Result<Page<Order>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT} AND o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&mut *conn)
        .await?;
        let items = Self::attach_items(&mut conn, rows).await?;
        Ok(Page::new(items, total, pagination))
    }

    /// How many live orders a customer has placed with a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn coupon_uses(
        conn: &mut PgConnection,
        coupon_id: CouponId,
        user_id: UserId,
    ) -> Result<i64, RepositoryError> {
        let uses = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders
             WHERE coupon_id = $1 AND user_id = $2 AND status <> 'cancelled'",
        )
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(uses)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_status(
        conn: &mut PgConnection,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(&mut *conn)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record the payment outcome and gateway transaction id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_payment(
        conn: &mut PgConnection,
        id: OrderId,
        status: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders
             SET payment_status = $2,
                 payment_transaction_id = COALESCE($3, payment_transaction_id),
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(transaction_id)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark an order cancelled with its reason and actor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_cancelled(
        conn: &mut PgConnection,
        id: OrderId,
        reason: &str,
        actor: Option<UserId>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders
             SET status = 'cancelled', cancel_reason = $2, cancelled_by = $3,
                 cancelled_at = now(), updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .bind(actor)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Persist carrier identifiers after shipment creation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_shipment(
        conn: &mut PgConnection,
        id: OrderId,
        shipment: &ShipmentInfo,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders
             SET shiprocket_order_id = $2, shiprocket_shipment_id = $3, awb_code = $4,
                 courier_name = $5, tracking_url = $6, label_url = $7, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(shipment.shiprocket_order_id)
        .bind(shipment.shipment_id)
        .bind(shipment.awb_code.as_deref())
        .bind(shipment.courier_name.as_deref())
        .bind(shipment.tracking_url.as_deref())
        .bind(shipment.label_url.as_deref())
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Drop the carrier order and AWB after a shipment is cancelled.
    ///
    /// The tracking history is kept for the record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn clear_shipment(conn: &mut PgConnection, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders
             SET shiprocket_order_id = NULL, shiprocket_shipment_id = NULL, awb_code = NULL,
                 courier_name = NULL, tracking_url = NULL, label_url = NULL, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_label_url(&self, id: OrderId, url: &str) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE orders SET label_url = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(url)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Replace the tracking timeline.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_tracking_history(
        conn: &mut PgConnection,
        id: OrderId,
        history: &[TrackingEvent],
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET tracking_history = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(Json(history))
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Append one event to the tracking timeline.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn push_tracking_event(
        conn: &mut PgConnection,
        id: OrderId,
        event: &TrackingEvent,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders
             SET tracking_history = tracking_history || jsonb_build_array($2::jsonb),
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(Json(event))
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_number() {
        assert_eq!(parse_order_number("STR000042"), Some(42));
        assert_eq!(parse_order_number(" str17 "), Some(17));
        assert_eq!(parse_order_number("42"), Some(42));
        assert_eq!(parse_order_number("asha"), None);
        assert_eq!(parse_order_number("ST"), None);
    }
}

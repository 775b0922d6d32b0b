//! Order lifecycle: status changes, cancellation and the carrier flow.
//!
//! Local changes that touch stock run in one transaction. Carrier calls are
//! made outside any transaction; a carrier failure leaves the order as it
//! was and surfaces as `502`.

use sqlx::PgConnection;
use tracing::{instrument, warn};

use stride_core::{MovementType, OrderId, OrderStatus, UserId};

use crate::db::{CouponRepository, OrderRepository, Page, Pagination};
use crate::error::{AppError, Result};
use crate::models::CurrentUser;
use crate::models::order::{Order, OrderQuery, PackageDimensions};
use crate::services::inventory::{MovementContext, restock_order};
use crate::shiprocket::shipments::{
    WebhookPayload, build_order_request, map_carrier_status, timeline, tracking_url,
};
use crate::state::AppState;

const STAFF_CANCEL_REASON: &str = "Cancelled by store";
const CUSTOMER_CANCEL_REASON: &str = "Cancelled by customer";

/// A supplied cancellation reason, or `default` when it is blank.
fn reason_or<'a>(reason: Option<&'a str>, default: &'a str) -> &'a str {
    reason.map(str::trim).filter(|r| !r.is_empty()).unwrap_or(default)
}

/// Undo an order's effects on stock and coupons and mark it cancelled.
///
/// Every line goes back to stock with a `movement_type` ledger entry and a
/// consumed coupon use is released.
///
/// # Errors
///
/// Returns `AppError::Database` if a write fails.
pub async fn release_order(
    conn: &mut PgConnection,
    order: &Order,
    reason: &str,
    actor: Option<UserId>,
    movement_type: MovementType,
) -> Result<()> {
    let ctx = MovementContext {
        movement_type,
        actor,
        order_id: Some(order.id),
        note: Some(reason),
    };
    restock_order(conn, order, &ctx).await?;
    if let Some(coupon_id) = CouponRepository::for_order(conn, order.id).await? {
        CouponRepository::release(conn, coupon_id).await?;
    }
    OrderRepository::set_cancelled(conn, order.id, reason, actor).await?;
    Ok(())
}

pub struct OrderService<'a> {
    state: &'a AppState,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn orders(&self) -> OrderRepository<'_> {
        OrderRepository::new(self.state.pool())
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, query: &OrderQuery) -> Result<Page<Order>> {
        if let (Some(from), Some(to)) = (query.from, query.to)
            && from > to
        {
            return Err(AppError::BadRequest("from must not be after to".to_string()));
        }
        let pagination = Pagination::new(query.page, query.per_page);
        Ok(self.orders().list(query, pagination).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown order.
    pub async fn get(&self, id: OrderId) -> Result<Order> {
        self.orders()
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_for_user(&self, user: UserId, pagination: Pagination) -> Result<Page<Order>> {
        Ok(self.orders().list_for_user(user, pagination).await?)
    }

    /// A customer's own order. Other customers' orders look missing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order does not exist or belongs
    /// to someone else.
    pub async fn get_for_user(&self, user: &CurrentUser, id: OrderId) -> Result<Order> {
        let order = self.get(id).await?;
        if order.user_id != user.id && !user.is_staff() {
            return Err(AppError::NotFound("Order".to_string()));
        }
        Ok(order)
    }

    /// Move an order one step forward.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` when the order is in a terminal state.
    pub async fn advance(&self, id: OrderId, actor: UserId) -> Result<Order> {
        let order = self.get(id).await?;
        let next = order.status.next().ok_or_else(|| {
            AppError::Conflict(format!("order is {} and cannot advance", order.status))
        })?;
        self.update_status(id, next, None, actor).await
    }

    /// Move an order to a chosen status.
    ///
    /// Only forward moves are accepted; cancelling goes through
    /// [`Self::cancel`] so stock is returned.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transition` for a refused move.
    #[instrument(skip(self, reason), fields(order_id = %id, target = %target))]
    pub async fn update_status(
        &self,
        id: OrderId,
        target: OrderStatus,
        reason: Option<&str>,
        actor: UserId,
    ) -> Result<Order> {
        if target == OrderStatus::Cancelled {
            return self.cancel_by_staff(id, reason, actor).await;
        }

        let mut tx = self.state.pool().begin().await?;
        let order = OrderRepository::find(&mut tx, id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        order.status.check_transition(target)?;
        OrderRepository::set_status(&mut tx, id, target).await?;
        tx.commit().await?;

        tracing::info!(from = %order.status, to = %target, actor = %actor, "Order status changed");
        self.get(id).await
    }

    /// Cancel an order, return its stock and cancel the carrier order.
    ///
    /// The carrier cancellation is best effort; a failure is logged and the
    /// local cancellation stands.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transition` if the order is already delivered or
    /// cancelled.
    #[instrument(skip(self, reason), fields(order_id = %id))]
    pub async fn cancel(&self, id: OrderId, reason: &str, actor: Option<UserId>) -> Result<Order> {
        let mut tx = self.state.pool().begin().await?;
        let order = OrderRepository::find(&mut tx, id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        order.status.check_transition(OrderStatus::Cancelled)?;
        release_order(&mut tx, &order, reason, actor, MovementType::Cancellation).await?;
        tx.commit().await?;

        tracing::info!(units = order.total_units(), "Order cancelled and restocked");

        if let (Some(sr_order_id), Some(client)) =
            (order.shipment.shiprocket_order_id, self.state.shiprocket())
            && let Err(e) = client.cancel_orders(&[sr_order_id]).await
        {
            warn!(error = %e, sr_order_id, "Shiprocket cancellation failed");
        }

        self.get(id).await
    }

    /// Staff cancellation; a blank reason is recorded as the store's.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transition` if the order is already delivered or
    /// cancelled.
    pub async fn cancel_by_staff(
        &self,
        id: OrderId,
        reason: Option<&str>,
        actor: UserId,
    ) -> Result<Order> {
        self.cancel(id, reason_or(reason, STAFF_CANCEL_REASON), Some(actor))
            .await
    }

    /// Customer cancellation, allowed until the order enters fulfilment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` once the order is being fulfilled.
    pub async fn cancel_by_customer(
        &self,
        user: &CurrentUser,
        id: OrderId,
        reason: Option<&str>,
    ) -> Result<Order> {
        let order = self.get_for_user(user, id).await?;
        if !order.status.customer_can_cancel() {
            return Err(AppError::Conflict(format!(
                "orders that are {} can no longer be cancelled",
                order.status
            )));
        }
        self.cancel(id, reason_or(reason, CUSTOMER_CANCEL_REASON), Some(user.id))
            .await
    }

    /// Create the carrier order, assign an AWB and request pickup.
    ///
    /// A carrier order that was created but never got an AWB is resumed
    /// rather than created twice.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the order cannot ship or already has
    /// an AWB, `AppError::ServiceUnavailable` without Shiprocket credentials
    /// and `AppError::Shiprocket` for carrier failures.
    #[instrument(skip(self, dimensions), fields(order_id = %id))]
    pub async fn create_shipment(
        &self,
        id: OrderId,
        dimensions: &PackageDimensions,
    ) -> Result<Order> {
        let client = self.state.require_shiprocket()?;
        let order = self.get(id).await?;
        if !order.status.can_ship() {
            return Err(AppError::Conflict(format!(
                "orders that are {} cannot be shipped",
                order.status
            )));
        }
        if order.shipment.awb_code.is_some() {
            return Err(AppError::Conflict(
                "shipment already created for this order".to_string(),
            ));
        }

        let mut shipment = order.shipment.clone();
        let shipment_id = match (shipment.shiprocket_order_id, shipment.shipment_id) {
            (Some(_), Some(shipment_id)) => shipment_id,
            _ => {
                let request = build_order_request(&order, client.pickup_location(), dimensions);
                let created = client.create_order(&request).await?;
                shipment.shiprocket_order_id = Some(created.order_id);
                shipment.shipment_id = Some(created.shipment_id);
                let mut conn = self.state.pool().acquire().await?;
                OrderRepository::set_shipment(&mut conn, id, &shipment).await?;
                created.shipment_id
            }
        };

        let awb = client.assign_awb(shipment_id).await?;
        if let Err(e) = client.generate_pickup(shipment_id).await {
            warn!(error = %e, shipment_id, "Pickup request failed, AWB kept");
        }

        shipment.tracking_url = Some(tracking_url(&awb.awb_code));
        shipment.awb_code = Some(awb.awb_code);
        shipment.courier_name = awb.courier_name;

        let mut tx = self.state.pool().begin().await?;
        OrderRepository::set_shipment(&mut tx, id, &shipment).await?;
        let current = OrderRepository::find(&mut tx, id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        if current.status.can_ship() {
            OrderRepository::set_status(&mut tx, id, OrderStatus::Shipped).await?;
        }
        tx.commit().await?;

        tracing::info!(
            awb = shipment.awb_code.as_deref().unwrap_or_default(),
            courier = shipment.courier_name.as_deref().unwrap_or_default(),
            "Shipment created"
        );
        self.get(id).await
    }

    /// Refresh the tracking timeline from the carrier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the order has no AWB and
    /// `AppError::Shiprocket` for carrier failures.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn track(&self, id: OrderId) -> Result<Order> {
        let client = self.state.require_shiprocket()?;
        let order = self.get(id).await?;
        let awb = order
            .shipment
            .awb_code
            .as_deref()
            .ok_or_else(|| AppError::Conflict("order has no AWB yet".to_string()))?;

        let data = client.track_awb(awb).await?;
        let history = timeline(&data.shipment_track_activities);

        let mut tx = self.state.pool().begin().await?;
        let current = OrderRepository::find(&mut tx, id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        OrderRepository::set_tracking_history(&mut tx, id, &history).await?;
        if let Some(target) = data.current_status().and_then(map_carrier_status)
            && current.status.can_transition_to(target)
        {
            OrderRepository::set_status(&mut tx, id, target).await?;
            tracing::info!(from = %current.status, to = %target, "Carrier status applied");
        }
        tx.commit().await?;

        self.get(id).await
    }

    /// Cancel the carrier order and clear the AWB. A `shipped` order goes
    /// back to `processing` so it can be shipped again.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if there is no carrier order and
    /// `AppError::Shiprocket` for carrier failures.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel_shipment(&self, id: OrderId) -> Result<Order> {
        let client = self.state.require_shiprocket()?;
        let order = self.get(id).await?;
        let sr_order_id = order
            .shipment
            .shiprocket_order_id
            .ok_or_else(|| AppError::Conflict("order has no shipment".to_string()))?;
        if order.status == OrderStatus::Delivered {
            return Err(AppError::Conflict(
                "delivered shipments cannot be cancelled".to_string(),
            ));
        }

        client.cancel_orders(&[sr_order_id]).await?;

        let mut tx = self.state.pool().begin().await?;
        let current = OrderRepository::find(&mut tx, id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        OrderRepository::clear_shipment(&mut tx, id).await?;
        let fallback = current.status.after_shipment_cancelled();
        if fallback != current.status {
            OrderRepository::set_status(&mut tx, id, fallback).await?;
        }
        tx.commit().await?;

        tracing::info!(sr_order_id, status = %fallback, "Shipment cancelled");
        self.get(id).await
    }

    /// Request a shipping label and store its URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the order has no AWB and
    /// `AppError::Shiprocket` for carrier failures.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn generate_label(&self, id: OrderId) -> Result<Order> {
        let client = self.state.require_shiprocket()?;
        let order = self.get(id).await?;
        let shipment_id = match (order.shipment.shipment_id, &order.shipment.awb_code) {
            (Some(shipment_id), Some(_)) => shipment_id,
            _ => return Err(AppError::Conflict("order has no AWB yet".to_string())),
        };

        let url = client.generate_label(shipment_id).await?;
        self.orders().set_label_url(id, &url).await?;
        self.get(id).await
    }

    /// Apply a carrier status push.
    ///
    /// Pushes for unknown shipments are acknowledged and ignored so the
    /// carrier does not retry them.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a write fails.
    #[instrument(skip(self, payload), fields(awb = payload.awb.as_deref().unwrap_or_default()))]
    pub async fn apply_webhook(&self, payload: &WebhookPayload) -> Result<Option<Order>> {
        let Some(order) = self
            .orders()
            .find_by_shipment(payload.awb.as_deref(), payload.sr_order_id)
            .await?
        else {
            warn!(order_ref = ?payload.order_id, "Webhook for unknown shipment ignored");
            return Ok(None);
        };

        let mut tx = self.state.pool().begin().await?;
        let current = OrderRepository::find(&mut tx, order.id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        if let Some(event) = payload.event() {
            OrderRepository::push_tracking_event(&mut tx, order.id, &event).await?;
            if let Some(target) = map_carrier_status(&event.status)
                && current.status.can_transition_to(target)
            {
                OrderRepository::set_status(&mut tx, order.id, target).await?;
                tracing::info!(from = %current.status, to = %target, "Carrier push applied");
            }
        }
        tx.commit().await?;

        Ok(Some(self.get(order.id).await?))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_or_defaults_blank_reasons() {
        assert_eq!(reason_or(None, STAFF_CANCEL_REASON), "Cancelled by store");
        assert_eq!(reason_or(Some("   "), STAFF_CANCEL_REASON), "Cancelled by store");
        assert_eq!(
            reason_or(Some(" Address undeliverable "), STAFF_CANCEL_REASON),
            "Address undeliverable"
        );
        assert_eq!(reason_or(None, CUSTOMER_CANCEL_REASON), "Cancelled by customer");
    }
}

//! Order lifecycle rules and totals.
//!
//! # Status flow
//!
//! ```text
//! pending_payment → confirmed → processing → shipped → delivered
//!        │              │            │           │
//!        └──────────────┴────────────┴───────────┴──→ cancelled
//! ```
//!
//! Forward moves may skip steps (an admin can mark a confirmed order as
//! shipped directly). Backward moves are rejected, and `delivered` and
//! `cancelled` are terminal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{OrderId, OrderStatus, round_money};

/// The forward sequence, excluding `cancelled`.
const FORWARD: [OrderStatus; 5] = [
    OrderStatus::PendingPayment,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
];

/// Why a status change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("order is already {0}")]
    Unchanged(OrderStatus),
    #[error("order is {0} and can no longer change status")]
    Terminal(OrderStatus),
    #[error("cannot move order from {from} back to {to}")]
    Backward { from: OrderStatus, to: OrderStatus },
}

impl OrderStatus {
    fn rank(self) -> Option<usize> {
        FORWARD.iter().position(|s| *s == self)
    }

    /// `delivered` and `cancelled` accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The next status in the forward sequence, used by the "advance" action.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.rank().and_then(|r| FORWARD.get(r + 1).copied())
    }

    /// Check whether the order may move to `target`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] if the move is a no-op, leaves a
    /// terminal state, or goes backwards in the sequence.
    pub fn check_transition(self, target: Self) -> Result<(), TransitionError> {
        if self == target {
            return Err(TransitionError::Unchanged(self));
        }
        if self.is_terminal() {
            return Err(TransitionError::Terminal(self));
        }
        if target == Self::Cancelled {
            return Ok(());
        }
        match (self.rank(), target.rank()) {
            (Some(from), Some(to)) if to > from => Ok(()),
            _ => Err(TransitionError::Backward {
                from: self,
                to: target,
            }),
        }
    }

    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.check_transition(target).is_ok()
    }

    /// Customers may cancel their own order until it enters fulfilment.
    #[must_use]
    pub const fn customer_can_cancel(self) -> bool {
        matches!(self, Self::PendingPayment | Self::Confirmed)
    }

    /// Whether a carrier shipment may be created for an order in this state.
    #[must_use]
    pub const fn can_ship(self) -> bool {
        matches!(self, Self::Confirmed | Self::Processing)
    }

    /// Status an order falls back to once its carrier shipment is
    /// cancelled, so it can be shipped again.
    #[must_use]
    pub const fn after_shipment_cancelled(self) -> Self {
        match self {
            Self::Shipped => Self::Processing,
            other => other,
        }
    }
}

/// Human-facing order number, e.g. `STR000123`.
#[must_use]
pub fn order_number(id: OrderId) -> String {
    format!("STR{:06}", id.as_i32())
}

/// Flat-rate shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub flat_fee: Decimal,
    /// Orders at or above this amount (after discount) ship free.
    pub free_threshold: Decimal,
}

impl ShippingPolicy {
    #[must_use]
    pub fn fee_for(&self, discounted_subtotal: Decimal) -> Decimal {
        if discounted_subtotal <= Decimal::ZERO || discounted_subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            self.flat_fee
        }
    }
}

/// A line that has been priced from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl PricedLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        round_money(self.unit_price * Decimal::from(self.quantity))
    }
}

/// Order money breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute totals for priced lines.
    ///
    /// The discount is clamped to the subtotal; shipping is charged on the
    /// discounted subtotal.
    #[must_use]
    pub fn compute(lines: &[PricedLine], discount: Decimal, policy: &ShippingPolicy) -> Self {
        let subtotal = lines.iter().map(PricedLine::line_total).sum::<Decimal>();
        let discount = round_money(discount.clamp(Decimal::ZERO, subtotal));
        let shipping = policy.fee_for(subtotal - discount);
        Self {
            subtotal,
            discount,
            shipping,
            total: subtotal - discount + shipping,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn policy() -> ShippingPolicy {
        ShippingPolicy {
            flat_fee: dec("99"),
            free_threshold: dec("1499"),
        }
    }

    #[test]
    fn test_cancelled_shipment_can_ship_again() {
        let status = OrderStatus::Shipped.after_shipment_cancelled();
        assert_eq!(status, OrderStatus::Processing);
        assert!(status.can_ship());
        assert_eq!(
            OrderStatus::Confirmed.after_shipment_cancelled(),
            OrderStatus::Confirmed
        );
        assert_eq!(
            OrderStatus::Delivered.after_shipment_cancelled(),
            OrderStatus::Delivered
        );
    }

    #[test]
    fn test_next_walks_forward_sequence() {
        assert_eq!(
            OrderStatus::PendingPayment.next(),
            Some(OrderStatus::Confirmed)
        );
        assert_eq!(OrderStatus::Shipped.next(), Some(OrderStatus::Delivered));
        assert_eq!(OrderStatus::Delivered.next(), None);
        assert_eq!(OrderStatus::Cancelled.next(), None);
    }

    #[test]
    fn test_forward_skips_are_allowed() {
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::PendingPayment.can_transition_to(OrderStatus::Processing));
    }

    #[test]
    fn test_backward_moves_are_rejected() {
        assert_eq!(
            OrderStatus::Shipped.check_transition(OrderStatus::Confirmed),
            Err(TransitionError::Backward {
                from: OrderStatus::Shipped,
                to: OrderStatus::Confirmed,
            })
        );
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::PendingPayment));
    }

    #[test]
    fn test_terminal_states_are_final() {
        assert_eq!(
            OrderStatus::Delivered.check_transition(OrderStatus::Confirmed),
            Err(TransitionError::Terminal(OrderStatus::Delivered))
        );
        assert_eq!(
            OrderStatus::Cancelled.check_transition(OrderStatus::Confirmed),
            Err(TransitionError::Terminal(OrderStatus::Cancelled))
        );
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_cancel_from_every_non_terminal_state() {
        for status in OrderStatus::ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(status.can_transition_to(OrderStatus::Cancelled), "{status}");
        }
    }

    #[test]
    fn test_same_status_is_unchanged() {
        assert_eq!(
            OrderStatus::Processing.check_transition(OrderStatus::Processing),
            Err(TransitionError::Unchanged(OrderStatus::Processing))
        );
    }

    #[test]
    fn test_customer_cancel_window() {
        assert!(OrderStatus::PendingPayment.customer_can_cancel());
        assert!(OrderStatus::Confirmed.customer_can_cancel());
        assert!(!OrderStatus::Processing.customer_can_cancel());
        assert!(!OrderStatus::Shipped.customer_can_cancel());
    }

    #[test]
    fn test_order_number_is_zero_padded() {
        assert_eq!(order_number(OrderId::new(42)), "STR000042");
    }

    #[test]
    fn test_totals_charge_shipping_below_threshold() {
        let lines = [PricedLine {
            unit_price: dec("1299"),
            quantity: 1,
        }];
        let totals = OrderTotals::compute(&lines, Decimal::ZERO, &policy());
        assert_eq!(totals.subtotal, dec("1299"));
        assert_eq!(totals.shipping, dec("99"));
        assert_eq!(totals.total, dec("1398"));
    }

    #[test]
    fn test_totals_free_shipping_uses_discounted_subtotal() {
        let lines = [PricedLine {
            unit_price: dec("800"),
            quantity: 2,
        }];
        let full = OrderTotals::compute(&lines, Decimal::ZERO, &policy());
        assert_eq!(full.shipping, Decimal::ZERO);

        let discounted = OrderTotals::compute(&lines, dec("200"), &policy());
        assert_eq!(discounted.shipping, dec("99"));
        assert_eq!(discounted.total, dec("1499"));
    }

    #[test]
    fn test_discount_clamped_to_subtotal() {
        let lines = [PricedLine {
            unit_price: dec("500"),
            quantity: 1,
        }];
        let totals = OrderTotals::compute(&lines, dec("900"), &policy());
        assert_eq!(totals.discount, dec("500"));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_empty_order_has_no_shipping() {
        let totals = OrderTotals::compute(&[], Decimal::ZERO, &policy());
        assert_eq!(totals.total, Decimal::ZERO);
    }
}

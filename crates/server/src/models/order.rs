//! Order domain types.
//!
//! An order groups several sub-records that are mutated by different flows:
//! checkout writes the items and totals, payment verification writes
//! [`PaymentInfo`], the carrier integration writes [`ShipmentInfo`], and
//! cancellation writes [`Cancellation`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stride_core::order::OrderTotals;
use stride_core::{
    OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
};

/// Delivery address captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".to_owned()
}

impl ShippingAddress {
    /// Trim fields and check that the carrier will accept the address.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first missing or malformed field.
    pub fn normalize(&mut self) -> Result<(), String> {
        for (field, value) in [
            ("name", &mut self.name),
            ("phone", &mut self.phone),
            ("line1", &mut self.line1),
            ("city", &mut self.city),
            ("state", &mut self.state),
            ("postal_code", &mut self.postal_code),
            ("country", &mut self.country),
        ] {
            *value = value.trim().to_owned();
            if value.is_empty() {
                return Err(format!("shipping address {field} is required"));
            }
        }
        self.line2 = super::non_blank(self.line2.take());
        self.email = super::non_blank(self.email.take());

        let digits: String = self.phone.chars().filter(char::is_ascii_digit).collect();
        if !(10..=13).contains(&digits.len()) {
            return Err("shipping address phone must have 10 to 13 digits".to_owned());
        }
        self.phone = digits;

        if self.country.eq_ignore_ascii_case("india")
            && (self.postal_code.len() != 6 || !self.postal_code.chars().all(|c| c.is_ascii_digit()))
        {
            return Err("postal code must be a 6 digit PIN code".to_owned());
        }
        Ok(())
    }
}

/// Payment sub-record.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Gateway-side order id the checkout UI pays against.
    pub gateway_order_id: Option<String>,
    pub transaction_id: Option<String>,
}

/// One entry in the carrier tracking timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub status: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Shipping sub-record populated by the carrier integration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShipmentInfo {
    pub shiprocket_order_id: Option<i64>,
    pub shipment_id: Option<i64>,
    pub awb_code: Option<String>,
    pub courier_name: Option<String>,
    pub tracking_url: Option<String>,
    pub label_url: Option<String>,
    pub tracking_history: Vec<TrackingEvent>,
}

/// Cancellation sub-record.
#[derive(Debug, Clone, Serialize)]
pub struct Cancellation {
    pub reason: String,
    /// `None` when the system cancelled the order (failed payment).
    pub cancelled_by: Option<UserId>,
    pub cancelled_at: DateTime<Utc>,
}

/// A purchased line with name and price snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// A persisted order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub status: OrderStatus,
    pub payment: PaymentInfo,
    pub shipping_address: ShippingAddress,
    pub shipment: ShipmentInfo,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub coupon_code: Option<String>,
    pub cancellation: Option<Cancellation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub const fn has_shipment(&self) -> bool {
        self.shipment.shiprocket_order_id.is_some()
    }

    #[must_use]
    pub fn total_units(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// A line to insert with a new order.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Everything needed to insert an order row.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub gateway_order_id: Option<String>,
    pub shipping_address: ShippingAddress,
    pub totals: OrderTotals,
    pub coupon_id: Option<stride_core::CouponId>,
    pub coupon_code: Option<String>,
    pub items: Vec<NewOrderItem>,
}

/// Admin listing filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Matches order number, customer name, email or AWB code.
    #[serde(alias = "q")]
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Body of the free-choice status update.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    /// Required by convention when `status` is `cancelled`.
    pub reason: Option<String>,
}

/// Body of a cancellation request.
#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// Optional dimensions for shipment creation. Defaults suit a shoe box.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PackageDimensions {
    #[serde(default = "PackageDimensions::default_length")]
    pub length_cm: Decimal,
    #[serde(default = "PackageDimensions::default_breadth")]
    pub breadth_cm: Decimal,
    #[serde(default = "PackageDimensions::default_height")]
    pub height_cm: Decimal,
    /// Weight of one pair, multiplied by the unit count.
    #[serde(default = "PackageDimensions::default_weight")]
    pub weight_kg_per_unit: Decimal,
}

impl PackageDimensions {
    fn default_length() -> Decimal {
        Decimal::from(33)
    }
    fn default_breadth() -> Decimal {
        Decimal::from(22)
    }
    fn default_height() -> Decimal {
        Decimal::from(12)
    }
    fn default_weight() -> Decimal {
        Decimal::new(9, 1)
    }
}

impl Default for PackageDimensions {
    fn default() -> Self {
        Self {
            length_cm: Self::default_length(),
            breadth_cm: Self::default_breadth(),
            height_cm: Self::default_height(),
            weight_kg_per_unit: Self::default_weight(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: " Asha Menon ".to_owned(),
            phone: "+91 98765-43210".to_owned(),
            email: Some(" ".to_owned()),
            line1: "12 MG Road".to_owned(),
            line2: None,
            city: "Bengaluru".to_owned(),
            state: "Karnataka".to_owned(),
            postal_code: "560001".to_owned(),
            country: "India".to_owned(),
        }
    }

    #[test]
    fn test_address_normalize() {
        let mut a = address();
        assert!(a.normalize().is_ok());
        assert_eq!(a.name, "Asha Menon");
        assert_eq!(a.phone, "919876543210");
        assert_eq!(a.email, None);
    }

    #[test]
    fn test_address_requires_fields() {
        let mut a = ShippingAddress {
            city: "  ".to_owned(),
            ..address()
        };
        assert_eq!(
            a.normalize(),
            Err("shipping address city is required".to_owned())
        );
    }

    #[test]
    fn test_address_validates_pin_code() {
        let mut a = ShippingAddress {
            postal_code: "5600".to_owned(),
            ..address()
        };
        assert!(a.normalize().is_err());
    }

    #[test]
    fn test_default_package() {
        let p = PackageDimensions::default();
        assert_eq!(p.weight_kg_per_unit, Decimal::new(9, 1));
    }
}

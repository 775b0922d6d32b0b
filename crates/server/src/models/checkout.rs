//! Checkout request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stride_core::order::OrderTotals;
use stride_core::{CurrencyCode, PaymentMethod, ProductId};

use super::cart::CartItemInput;
use super::coupon::CouponValidation;
use super::order::{Order, ShippingAddress};

/// Most units of one line a customer can buy at once.
pub const MAX_LINE_QUANTITY: i32 = 10;

/// Quote body. Without `items` the customer's cart is quoted.
#[derive(Debug, Default, Deserialize)]
pub struct QuoteRequest {
    pub items: Option<Vec<CartItemInput>>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Option<Vec<CartItemInput>>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
}

/// A line priced from the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub available: i32,
}

#[derive(Debug, Serialize)]
pub struct Quote {
    pub lines: Vec<QuoteLine>,
    pub totals: OrderTotals,
    pub currency: CurrencyCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponValidation>,
}

/// What the client needs to open the Razorpay checkout.
#[derive(Debug, Serialize)]
pub struct GatewayCheckout {
    pub key_id: String,
    pub gateway_order_id: String,
    /// Total in minor units (paise).
    pub amount: i64,
    pub currency: CurrencyCode,
}

#[derive(Debug, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<GatewayCheckout>,
}

/// Posted back by the client after the Razorpay checkout closes.
#[derive(Debug, Deserialize)]
pub struct PaymentVerification {
    #[serde(alias = "razorpay_order_id")]
    pub gateway_order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_accepts_razorpay_names() {
        let body = serde_json::json!({
            "razorpay_order_id": "order_1",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": "abc",
        });
        let v: PaymentVerification = serde_json::from_value(body).unwrap();
        assert_eq!(v.gateway_order_id, "order_1");
        assert_eq!(v.payment_id, "pay_1");
    }

    #[test]
    fn test_quote_request_defaults_to_cart() {
        let q: QuoteRequest = serde_json::from_str("{}").unwrap();
        assert!(q.items.is_none());
        assert!(q.coupon_code.is_none());
    }
}

//! Server-side cart for logged-in customers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stride_core::{CartItemId, ProductId};

/// A cart line priced from the catalog at read time.
#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub slug: String,
    pub image: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    /// Units currently sellable for this line.
    pub available: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub subtotal: Decimal,
    pub item_count: i32,
}

impl Cart {
    #[must_use]
    pub fn new(items: Vec<CartItem>) -> Self {
        let subtotal = items.iter().map(|i| i.line_total).sum();
        let item_count = items.iter().map(|i| i.quantity).sum();
        Self {
            items,
            subtotal,
            item_count,
        }
    }
}

/// Add-to-cart body; also used for checkout lines.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItemInput {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CartItemUpdate {
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i32, price: i64) -> CartItem {
        CartItem {
            id: CartItemId::new(1),
            product_id: ProductId::new(1),
            product_name: "Court Runner".to_owned(),
            slug: "court-runner".to_owned(),
            image: None,
            size: Some("9".to_owned()),
            color: None,
            quantity,
            unit_price: Decimal::from(price),
            line_total: Decimal::from(price) * Decimal::from(quantity),
            available: 10,
        }
    }

    #[test]
    fn test_cart_totals() {
        let cart = Cart::new(vec![item(2, 1000), item(1, 499)]);
        assert_eq!(cart.subtotal, Decimal::from(2499));
        assert_eq!(cart.item_count, 3);
    }
}

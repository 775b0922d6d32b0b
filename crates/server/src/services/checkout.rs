//! Quoting, order placement and payment verification.
//!
//! Placing an order prices every line from the catalog, takes stock with a
//! `sale` movement per line, consumes the coupon and writes the order in a
//! single transaction. A line that cannot be filled rolls everything back.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{instrument, warn};

use stride_core::coupon::normalize_code;
use stride_core::inventory::StockError;
use stride_core::order::{OrderTotals, PricedLine, ShippingPolicy};
use stride_core::{
    Money, MovementType, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
};

use crate::db::{
    CartRepository, CouponRepository, OrderRepository, ProductRepository, StockMovementRepository,
};
use crate::error::{AppError, Result};
use crate::models::CurrentUser;
use crate::models::cart::CartItemInput;
use crate::models::checkout::{
    CheckoutRequest, GatewayCheckout, MAX_LINE_QUANTITY, PaymentVerification, PlacedOrder, Quote,
    QuoteLine, QuoteRequest,
};
use crate::models::coupon::CouponValidation;
use crate::models::non_blank;
use crate::models::order::{NewOrder, NewOrderItem, Order};
use crate::models::product::Product;
use crate::services::coupons::evaluate;
use crate::services::inventory::MovementContext;
use crate::services::orders::release_order;
use crate::services::payments::{new_gateway_order_id, verify_signature};
use crate::state::AppState;

const PAYMENT_FAILED_REASON: &str = "Payment verification failed";

fn check_quantity(quantity: i32) -> Result<()> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY}"
        )))
    }
}

/// Quantity of a line after adding `added` units to `existing` ones.
///
/// # Errors
///
/// Returns `AppError::BadRequest` when `added` is out of range or the sum
/// does not fit in a line.
pub fn add_to_line(existing: i32, added: i32) -> Result<i32> {
    check_quantity(added)?;
    existing
        .checked_add(added)
        .ok_or_else(|| AppError::BadRequest("quantity is too large".to_string()))
}

/// Merge lines for the same product, size and colour.
///
/// Each incoming line is bounds-checked before it is summed.
fn merge_lines(items: Vec<CartItemInput>) -> Result<Vec<CartItemInput>> {
    let mut merged: BTreeMap<(ProductId, Option<String>, Option<String>), i32> = BTreeMap::new();
    let mut order = Vec::new();
    for item in items {
        let size = non_blank(item.size);
        let color = non_blank(item.color);
        let key = (item.product_id, size, color);
        if !merged.contains_key(&key) {
            order.push(key.clone());
        }
        check_quantity(item.quantity)?;
        let total = merged.entry(key).or_default();
        *total = total.saturating_add(item.quantity);
    }
    Ok(order
        .into_iter()
        .map(|key| {
            let quantity = merged.get(&key).copied().unwrap_or_default();
            let (product_id, size, color) = key;
            CartItemInput {
                product_id,
                size,
                color,
                quantity,
            }
        })
        .collect())
}

/// Price lines against the catalog and check they can be filled.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an empty basket, a bad quantity or a
/// missing size, `AppError::NotFound` for an unknown product and
/// `AppError::Stock` when a line cannot be filled.
pub fn price_lines(items: &[CartItemInput], products: &[Product]) -> Result<Vec<QuoteLine>> {
    if items.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    items
        .iter()
        .map(|item| {
            if !(1..=MAX_LINE_QUANTITY).contains(&item.quantity) {
                return Err(AppError::BadRequest(format!(
                    "quantity must be between 1 and {MAX_LINE_QUANTITY}"
                )));
            }
            let product = products
                .iter()
                .find(|p| p.id == item.product_id && p.is_active)
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

            let size = item.size.as_deref();
            if product.has_sizes() {
                let size = size.ok_or_else(|| {
                    AppError::BadRequest(format!("choose a size for {}", product.name))
                })?;
                if !product.sizes.iter().any(|s| s.size == size) {
                    return Err(StockError::UnknownSize(size.to_owned()).into());
                }
            }
            if let Some(color) = item.color.as_deref()
                && !product.colors.is_empty()
                && !product.colors.iter().any(|c| c.eq_ignore_ascii_case(color))
            {
                return Err(AppError::BadRequest(format!(
                    "{} is not available in {color}",
                    product.name
                )));
            }

            let available = product.available(size).unwrap_or(0);
            if item.quantity > available {
                return Err(StockError::Insufficient {
                    product: product.name.clone(),
                    size: item.size.clone().filter(|_| product.has_sizes()),
                    requested: item.quantity,
                    available,
                }
                .into());
            }

            let priced = PricedLine {
                unit_price: product.price,
                quantity: item.quantity,
            };
            Ok(QuoteLine {
                product_id: product.id,
                product_name: product.name.clone(),
                size: item.size.clone().filter(|_| product.has_sizes()),
                color: item.color.clone(),
                quantity: item.quantity,
                unit_price: product.price,
                line_total: priced.line_total(),
                available,
            })
        })
        .collect()
}

fn subtotal(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(PricedLine::line_total).sum()
}

fn priced(lines: &[QuoteLine]) -> Vec<PricedLine> {
    lines
        .iter()
        .map(|l| PricedLine {
            unit_price: l.unit_price,
            quantity: l.quantity,
        })
        .collect()
}

pub struct CheckoutService<'a> {
    state: &'a AppState,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Explicit lines, or the customer's cart when none are given.
    async fn resolve_items(
        &self,
        user: UserId,
        items: Option<Vec<CartItemInput>>,
    ) -> Result<(Vec<CartItemInput>, bool)> {
        match items {
            Some(items) => Ok((merge_lines(items)?, false)),
            None => {
                let cart = CartRepository::new(self.state.pool()).items(user).await?;
                let items = cart
                    .into_iter()
                    .map(|i| CartItemInput {
                        product_id: i.product_id,
                        size: i.size,
                        color: i.color,
                        quantity: i.quantity,
                    })
                    .collect();
                Ok((merge_lines(items)?, true))
            }
        }
    }

    async fn load_lines(conn: &mut PgConnection, items: &[CartItemInput]) -> Result<Vec<QuoteLine>> {
        let ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        let products = ProductRepository::find_many(conn, &ids).await?;
        price_lines(items, &products)
    }

    /// Price a basket with an optional coupon.
    ///
    /// A rejected coupon does not fail the quote; the rejection is reported
    /// alongside totals without a discount.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`price_lines`].
    pub async fn quote(&self, user: UserId, request: QuoteRequest) -> Result<Quote> {
        let (items, _) = self.resolve_items(user, request.items).await?;
        let mut conn = self.state.pool().acquire().await?;
        let lines = Self::load_lines(&mut conn, &items).await?;
        let priced = priced(&lines);
        let subtotal = subtotal(&priced);

        let coupon = match non_blank(request.coupon_code) {
            Some(code) => {
                let code = normalize_code(&code);
                let outcome = evaluate(&mut conn, &code, subtotal, user, false)
                    .await?
                    .map(|(_, discount)| discount);
                Some(CouponValidation::from_outcome(code, outcome))
            }
            None => None,
        };
        let discount = coupon.as_ref().map_or(Decimal::ZERO, |c| c.discount);

        Ok(Quote {
            totals: OrderTotals::compute(&priced, discount, &self.policy()),
            lines,
            currency: self.state.config().store.currency,
            coupon,
        })
    }

    fn policy(&self) -> ShippingPolicy {
        self.state.config().store.shipping
    }

    /// Place an order.
    ///
    /// Cash-on-delivery orders start `confirmed`. Online orders start
    /// `pending_payment` with a gateway order reference the client pays
    /// against.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an invalid address,
    /// `AppError::Coupon` for a rejected coupon, `AppError::Stock` when a
    /// line cannot be filled and `AppError::ServiceUnavailable` for online
    /// payment without gateway credentials.
    #[instrument(skip(self, request), fields(user_id = %user, method = %request.payment_method))]
    pub async fn place_order(&self, user: UserId, mut request: CheckoutRequest) -> Result<PlacedOrder> {
        request
            .shipping_address
            .normalize()
            .map_err(AppError::BadRequest)?;

        let razorpay = match request.payment_method {
            PaymentMethod::Online => Some(self.state.config().razorpay.as_ref().ok_or_else(|| {
                AppError::ServiceUnavailable("online payments are not configured".to_string())
            })?),
            PaymentMethod::Cod => None,
        };

        let (items, from_cart) = self.resolve_items(user, request.items.take()).await?;

        let mut tx = self.state.pool().begin().await?;
        let lines = Self::load_lines(&mut tx, &items).await?;
        let priced = priced(&lines);
        let subtotal = subtotal(&priced);

        let coupon = match non_blank(request.coupon_code.take()) {
            Some(code) => {
                let accepted = evaluate(&mut tx, &normalize_code(&code), subtotal, user, true)
                    .await?
                    .map_err(AppError::Coupon)?;
                Some(accepted)
            }
            None => None,
        };
        let discount = coupon.as_ref().map_or(Decimal::ZERO, |(_, d)| *d);
        let totals = OrderTotals::compute(&priced, discount, &self.policy());

        let (status, gateway_order_id) = match request.payment_method {
            PaymentMethod::Cod => (OrderStatus::Confirmed, None),
            PaymentMethod::Online => (OrderStatus::PendingPayment, Some(new_gateway_order_id())),
        };

        let new_order = NewOrder {
            user_id: user,
            status,
            payment_method: request.payment_method,
            gateway_order_id,
            shipping_address: request.shipping_address,
            totals,
            coupon_id: coupon.as_ref().map(|(c, _)| c.id),
            coupon_code: coupon.as_ref().map(|(c, _)| c.code.clone()),
            items: lines
                .iter()
                .map(|l| NewOrderItem {
                    product_id: l.product_id,
                    product_name: l.product_name.clone(),
                    size: l.size.clone(),
                    color: l.color.clone(),
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
        };
        let order_id = OrderRepository::insert(&mut tx, &new_order).await?;

        take_stock(&mut tx, &lines, order_id, user).await?;
        if let Some((coupon, _)) = &coupon {
            CouponRepository::consume(&mut tx, coupon.id).await?;
        }
        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            total = %totals.total,
            lines = lines.len(),
            "Order placed"
        );

        if from_cart
            && let Err(e) = CartRepository::new(self.state.pool()).clear(user).await
        {
            warn!(error = %e, "Failed to clear cart after checkout");
        }

        let order = OrderRepository::new(self.state.pool())
            .get(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let payment = match (razorpay, &order.payment.gateway_order_id) {
            (Some(config), Some(gateway_order_id)) => {
                let currency = self.state.config().store.currency;
                let amount = Money::new(order.totals.total, currency)
                    .minor_units()
                    .ok_or_else(|| AppError::Internal("order total out of range".to_string()))?;
                Some(GatewayCheckout {
                    key_id: config.key_id.clone(),
                    gateway_order_id: gateway_order_id.clone(),
                    amount,
                    currency,
                })
            }
            _ => None,
        };

        Ok(PlacedOrder { order, payment })
    }

    /// Check the gateway signature for an online order.
    ///
    /// On success the payment is `paid` and the order `confirmed`. On
    /// failure the payment is `failed` and the order is cancelled with its
    /// stock returned as `payment_failed` movements.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unprocessable` when verification fails (after the
    /// order has been cancelled) and `AppError::Conflict` when the order is
    /// no longer awaiting payment.
    #[instrument(skip(self, user, verification), fields(order_id = %id))]
    pub async fn verify_payment(
        &self,
        user: &CurrentUser,
        id: OrderId,
        verification: &PaymentVerification,
    ) -> Result<Order> {
        let config = self.state.config().razorpay.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("online payments are not configured".to_string())
        })?;

        let mut tx = self.state.pool().begin().await?;
        let order = OrderRepository::find(&mut tx, id, true)
            .await?
            .filter(|o| o.user_id == user.id || user.is_staff())
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        if order.payment.method != PaymentMethod::Online {
            return Err(AppError::BadRequest(
                "order is not an online payment".to_string(),
            ));
        }
        if order.payment.status == PaymentStatus::Paid {
            return Ok(order);
        }
        if order.status != OrderStatus::PendingPayment {
            return Err(AppError::Conflict(
                "order is no longer awaiting payment".to_string(),
            ));
        }

        let matches_order =
            order.payment.gateway_order_id.as_deref() == Some(verification.gateway_order_id.as_str());
        let valid = matches_order
            && verify_signature(
                config,
                &verification.gateway_order_id,
                &verification.payment_id,
                &verification.signature,
            );

        if valid {
            OrderRepository::set_payment(
                &mut tx,
                id,
                PaymentStatus::Paid,
                Some(&verification.payment_id),
            )
            .await?;
            OrderRepository::set_status(&mut tx, id, OrderStatus::Confirmed).await?;
            tx.commit().await?;
            tracing::info!("Payment verified");
        } else {
            OrderRepository::set_payment(
                &mut tx,
                id,
                PaymentStatus::Failed,
                Some(&verification.payment_id),
            )
            .await?;
            release_order(
                &mut tx,
                &order,
                PAYMENT_FAILED_REASON,
                Some(user.id),
                MovementType::PaymentFailed,
            )
            .await?;
            tx.commit().await?;
            warn!("Payment verification failed, order cancelled");
            return Err(AppError::Unprocessable(
                "payment could not be verified".to_string(),
            ));
        }

        OrderRepository::new(self.state.pool())
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }
}

/// Take stock for every line with a `sale` movement.
async fn take_stock(
    conn: &mut PgConnection,
    lines: &[QuoteLine],
    order_id: OrderId,
    user: UserId,
) -> Result<()> {
    let ctx = MovementContext {
        movement_type: MovementType::Sale,
        actor: Some(user),
        order_id: Some(order_id),
        note: None,
    };
    for line in lines {
        let taken =
            ProductRepository::take_stock(conn, line.product_id, line.size.as_deref(), line.quantity)
                .await?;
        let Some(resulting) = taken else {
            // Sold meanwhile; report what is left now
            let available = ProductRepository::find(conn, line.product_id, false)
                .await?
                .and_then(|p| p.available(line.size.as_deref()))
                .unwrap_or(0);
            return Err(StockError::Insufficient {
                product: line.product_name.clone(),
                size: line.size.clone(),
                requested: line.quantity,
                available,
            }
            .into());
        };
        StockMovementRepository::insert(
            conn,
            &ctx.entry(line.product_id, line.size.clone(), -line.quantity, resulting),
        )
        .await?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use stride_core::inventory::SizeStock;

    use super::*;

    fn product(id: i32, sizes: &[(&str, i32)], stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Runner {id}"),
            slug: format!("runner-{id}"),
            description: String::new(),
            category: "running".to_owned(),
            price: Decimal::from(1999),
            compare_at_price: None,
            stock,
            sizes: sizes
                .iter()
                .map(|(s, n)| SizeStock {
                    size: (*s).to_owned(),
                    stock: *n,
                })
                .collect(),
            colors: vec!["Black".to_owned(), "White".to_owned()],
            images: vec![],
            is_active: true,
            is_featured: false,
            out_of_stock: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(id: i32, size: Option<&str>, quantity: i32) -> CartItemInput {
        CartItemInput {
            product_id: ProductId::new(id),
            size: size.map(str::to_owned),
            color: None,
            quantity,
        }
    }

    #[test]
    fn test_merge_lines_sums_duplicates() {
        let merged = merge_lines(vec![
            line(1, Some("9"), 1),
            line(2, None, 1),
            line(1, Some(" 9 "), 2),
        ])
        .unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].product_id, ProductId::new(1));
        assert_eq!(merged[0].quantity, 3);
        assert_eq!(merged[1].product_id, ProductId::new(2));
    }

    #[test]
    fn test_merge_lines_rejects_huge_quantities() {
        let err = merge_lines(vec![
            line(1, None, 2_000_000_000),
            line(1, None, 2_000_000_000),
        ])
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = merge_lines(vec![line(1, None, 0)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_add_to_line_bounds() {
        assert_eq!(add_to_line(3, 2).unwrap(), 5);
        assert!(matches!(
            add_to_line(3, i32::MAX).unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            add_to_line(i32::MAX, 1).unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert!(matches!(add_to_line(0, 0).unwrap_err(), AppError::BadRequest(_)));
    }

    #[test]
    fn test_price_lines_totals() {
        let products = [product(1, &[("9", 5)], 5)];
        let lines = price_lines(&[line(1, Some("9"), 2)], &products).unwrap();
        assert_eq!(lines[0].line_total, Decimal::from(3998));
        assert_eq!(lines[0].available, 5);
    }

    #[test]
    fn test_price_lines_requires_size() {
        let products = [product(1, &[("9", 5)], 5)];
        let err = price_lines(&[line(1, None, 1)], &products).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = price_lines(&[line(1, Some("12"), 1)], &products).unwrap_err();
        assert!(matches!(err, AppError::Stock(StockError::UnknownSize(_))));
    }

    #[test]
    fn test_price_lines_insufficient_stock() {
        let products = [product(1, &[("9", 1)], 1)];
        let err = price_lines(&[line(1, Some("9"), 2)], &products).unwrap_err();
        assert!(matches!(
            err,
            AppError::Stock(StockError::Insufficient {
                requested: 2,
                available: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_price_lines_rejects_empty_and_unknown() {
        assert!(matches!(
            price_lines(&[], &[]).unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            price_lines(&[line(7, None, 1)], &[]).unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_price_lines_out_of_stock_override() {
        let mut p = product(1, &[], 10);
        p.out_of_stock = true;
        let err = price_lines(&[line(1, None, 1)], &[p]).unwrap_err();
        assert!(matches!(err, AppError::Stock(StockError::Insufficient { available: 0, .. })));
    }

    #[test]
    fn test_price_lines_checks_color() {
        let products = [product(1, &[], 10)];
        let mut item = line(1, None, 1);
        item.color = Some("red".to_owned());
        assert!(matches!(
            price_lines(&[item], &products).unwrap_err(),
            AppError::BadRequest(_)
        ));
    }

    #[test]
    fn test_price_lines_quantity_bounds() {
        let products = [product(1, &[], 50)];
        assert!(price_lines(&[line(1, None, 0)], &products).is_err());
        assert!(price_lines(&[line(1, None, MAX_LINE_QUANTITY + 1)], &products).is_err());
    }
}

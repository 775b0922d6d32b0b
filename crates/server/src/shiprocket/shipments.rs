//! Shipment operations: order creation, AWB assignment, pickup, tracking,
//! cancellation and labels.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stride_core::{OrderStatus, PaymentMethod};

use super::ShiprocketError;
use super::client::ShiprocketClient;
use crate::models::order::{Order, PackageDimensions, TrackingEvent};

/// Public tracking page for an AWB.
#[must_use]
pub fn tracking_url(awb: &str) -> String {
    format!("https://shiprocket.co/tracking/{awb}")
}

/// Shiprocket reports local (IST) timestamps without an offset.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

// =============================================================================
// Request / response types
// =============================================================================

/// `orders/create/adhoc` request body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    /// Our order number; Shiprocket echoes it back in webhooks.
    pub order_id: String,
    pub order_date: String,
    pub pickup_location: String,
    pub billing_customer_name: String,
    pub billing_last_name: String,
    pub billing_address: String,
    pub billing_address_2: String,
    pub billing_city: String,
    pub billing_pincode: String,
    pub billing_state: String,
    pub billing_country: String,
    pub billing_email: String,
    pub billing_phone: String,
    pub shipping_is_billing: bool,
    pub order_items: Vec<CreateOrderItem>,
    /// `COD` or `Prepaid`.
    pub payment_method: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_charges: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sub_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub length: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub breadth: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub height: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,
}

/// A line of an adhoc order.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderItem {
    pub name: String,
    pub sku: String,
    pub units: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub selling_price: Decimal,
}

/// `orders/create/adhoc` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    pub order_id: i64,
    pub shipment_id: i64,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssignAwbRequest {
    shipment_id: i64,
}

#[derive(Debug, Deserialize)]
struct AssignAwbResponse {
    #[serde(default)]
    awb_assign_status: i32,
    #[serde(default)]
    response: Option<AssignAwbEnvelope>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssignAwbEnvelope {
    data: AssignedAwb,
}

/// Courier assignment result.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignedAwb {
    pub awb_code: String,
    #[serde(default)]
    pub courier_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ShipmentIds {
    shipment_id: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct PickupResponse {
    #[serde(default)]
    pickup_status: i32,
    #[serde(default)]
    response: Option<PickupDetails>,
}

/// Pickup scheduling result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PickupDetails {
    #[serde(default)]
    pub pickup_scheduled_date: Option<String>,
    #[serde(default)]
    pub pickup_token_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    tracking_data: TrackingData,
}

/// Tracking payload for one AWB.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingData {
    #[serde(default)]
    pub track_url: Option<String>,
    #[serde(default)]
    pub shipment_track: Vec<ShipmentTrack>,
    #[serde(default)]
    pub shipment_track_activities: Vec<TrackActivity>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TrackingData {
    /// Latest carrier status, e.g. `IN TRANSIT`.
    #[must_use]
    pub fn current_status(&self) -> Option<&str> {
        self.shipment_track
            .first()
            .and_then(|t| t.current_status.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipmentTrack {
    #[serde(default)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub courier_name: Option<String>,
}

/// One scan in the carrier timeline.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackActivity {
    pub date: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub activity: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, rename = "sr-status-label")]
    pub status_label: Option<String>,
}

impl TrackActivity {
    fn to_event(&self) -> TrackingEvent {
        let status = self
            .status_label
            .as_deref()
            .or(self.status.as_deref())
            .unwrap_or("UPDATE")
            .to_owned();
        TrackingEvent {
            status,
            location: self.location.clone().filter(|l| !l.trim().is_empty()),
            description: self.activity.clone(),
            occurred_at: parse_timestamp(&self.date).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Serialize)]
struct CancelRequest<'a> {
    ids: &'a [i64],
}

#[derive(Debug, Deserialize)]
struct LabelResponse {
    #[serde(default)]
    label_created: i32,
    #[serde(default)]
    label_url: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

/// Status push sent by Shiprocket to the webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub awb: Option<String>,
    #[serde(default)]
    pub current_status: Option<String>,
    /// Our order number, as sent at creation.
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub sr_order_id: Option<i64>,
    #[serde(default)]
    pub current_timestamp: Option<String>,
    #[serde(default)]
    pub shipment_status: Option<String>,
    #[serde(default)]
    pub scans: Vec<TrackActivity>,
}

impl WebhookPayload {
    /// Tracking event for the status this push reports.
    #[must_use]
    pub fn event(&self) -> Option<TrackingEvent> {
        let status = self
            .current_status
            .as_deref()
            .or(self.shipment_status.as_deref())?
            .trim()
            .to_owned();
        if status.is_empty() {
            return None;
        }
        let latest_scan = self.scans.last();
        Some(TrackingEvent {
            status,
            location: latest_scan.and_then(|s| s.location.clone()),
            description: latest_scan.and_then(|s| s.activity.clone()),
            occurred_at: self
                .current_timestamp
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
        })
    }
}

// =============================================================================
// Pure helpers
// =============================================================================

/// Map a carrier status onto the order lifecycle.
///
/// Only statuses that move the order forward are mapped; everything else
/// (RTO, NDR, pickup scheduled) leaves the order status alone.
#[must_use]
pub fn map_carrier_status(status: &str) -> Option<OrderStatus> {
    match status.trim().to_ascii_uppercase().replace('_', " ").as_str() {
        "DELIVERED" => Some(OrderStatus::Delivered),
        "SHIPPED" | "IN TRANSIT" | "PICKED UP" | "OUT FOR DELIVERY" | "REACHED AT DESTINATION HUB" => {
            Some(OrderStatus::Shipped)
        }
        _ => None,
    }
}

/// Convert carrier activities into a chronological timeline.
#[must_use]
pub fn timeline(activities: &[TrackActivity]) -> Vec<TrackingEvent> {
    let mut events: Vec<TrackingEvent> = activities.iter().map(TrackActivity::to_event).collect();
    events.sort_by_key(|e| e.occurred_at);
    events
}

/// Parse the carrier's local timestamps.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = ["%Y-%m-%d %H:%M:%S", "%d %m %Y %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())?;
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS)?;
    ist.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Build the adhoc order request for an order.
#[must_use]
pub fn build_order_request(
    order: &Order,
    pickup_location: &str,
    package: &PackageDimensions,
) -> CreateOrderRequest {
    let address = &order.shipping_address;
    let (first, last) = address
        .name
        .split_once(' ')
        .map_or((address.name.as_str(), ""), |(f, l)| (f, l.trim()));

    let order_items = order
        .items
        .iter()
        .map(|item| CreateOrderItem {
            name: item_name(&item.product_name, item.size.as_deref(), item.color.as_deref()),
            sku: sku(item.product_id.as_i32(), item.size.as_deref()),
            units: item.quantity,
            selling_price: item.unit_price,
        })
        .collect();

    CreateOrderRequest {
        order_id: order.order_number.clone(),
        order_date: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
        pickup_location: pickup_location.to_owned(),
        billing_customer_name: first.to_owned(),
        billing_last_name: last.to_owned(),
        billing_address: address.line1.clone(),
        billing_address_2: address.line2.clone().unwrap_or_default(),
        billing_city: address.city.clone(),
        billing_pincode: address.postal_code.clone(),
        billing_state: address.state.clone(),
        billing_country: address.country.clone(),
        billing_email: address
            .email
            .clone()
            .or_else(|| order.customer_email.clone())
            .unwrap_or_default(),
        billing_phone: address.phone.clone(),
        shipping_is_billing: true,
        order_items,
        payment_method: match order.payment.method {
            PaymentMethod::Cod => "COD",
            PaymentMethod::Online => "Prepaid",
        },
        shipping_charges: order.totals.shipping,
        total_discount: order.totals.discount,
        sub_total: order.totals.subtotal,
        length: package.length_cm,
        breadth: package.breadth_cm,
        height: package.height_cm,
        weight: package.weight_kg_per_unit * Decimal::from(order.total_units().max(1)),
    }
}

fn item_name(name: &str, size: Option<&str>, color: Option<&str>) -> String {
    match (size, color) {
        (Some(s), Some(c)) => format!("{name} ({c}, UK {s})"),
        (Some(s), None) => format!("{name} (UK {s})"),
        (None, Some(c)) => format!("{name} ({c})"),
        (None, None) => name.to_owned(),
    }
}

fn sku(product_id: i32, size: Option<&str>) -> String {
    size.map_or_else(
        || format!("STR-{product_id}"),
        |s| format!("STR-{product_id}-{s}"),
    )
}

// =============================================================================
// Client methods
// =============================================================================

impl ShiprocketClient {
    /// Create a carrier order.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError` if the request fails or is rejected.
    #[instrument(skip(self, request), fields(order = %request.order_id))]
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreatedOrder, ShiprocketError> {
        let created: CreatedOrder = self.post("orders/create/adhoc", request).await?;
        if created.shipment_id == 0 {
            return Err(ShiprocketError::UnexpectedResponse(
                "order created without a shipment".to_owned(),
            ));
        }
        Ok(created)
    }

    /// Assign a courier and AWB to a shipment.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError::UnexpectedResponse` when no AWB is assigned.
    #[instrument(skip(self))]
    pub async fn assign_awb(&self, shipment_id: i64) -> Result<AssignedAwb, ShiprocketError> {
        let response: AssignAwbResponse = self
            .post("courier/assign/awb", &AssignAwbRequest { shipment_id })
            .await?;
        match response.response {
            Some(envelope) if response.awb_assign_status == 1 => Ok(envelope.data),
            _ => Err(ShiprocketError::UnexpectedResponse(
                response
                    .message
                    .unwrap_or_else(|| "AWB was not assigned".to_owned()),
            )),
        }
    }

    /// Request a pickup for a shipment with an AWB.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError` if the request fails.
    #[instrument(skip(self))]
    pub async fn generate_pickup(&self, shipment_id: i64) -> Result<PickupDetails, ShiprocketError> {
        let response: PickupResponse = self
            .post(
                "courier/generate/pickup",
                &ShipmentIds {
                    shipment_id: vec![shipment_id],
                },
            )
            .await?;
        if response.pickup_status != 1 {
            tracing::warn!(shipment_id, "Shiprocket did not confirm pickup");
        }
        Ok(response.response.unwrap_or_default())
    }

    /// Fetch the tracking timeline for an AWB.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError` if the request fails.
    #[instrument(skip(self))]
    pub async fn track_awb(&self, awb: &str) -> Result<TrackingData, ShiprocketError> {
        let response: TrackResponse = self.get(&format!("courier/track/awb/{awb}")).await?;
        if let Some(error) = response
            .tracking_data
            .error
            .as_ref()
            .filter(|e| !e.is_empty())
            && response.tracking_data.shipment_track_activities.is_empty()
        {
            return Err(ShiprocketError::UnexpectedResponse(error.clone()));
        }
        Ok(response.tracking_data)
    }

    /// Cancel carrier orders by Shiprocket order id.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError` if the request fails.
    #[instrument(skip(self))]
    pub async fn cancel_orders(&self, ids: &[i64]) -> Result<(), ShiprocketError> {
        let _: serde_json::Value = self.post("orders/cancel", &CancelRequest { ids }).await?;
        Ok(())
    }

    /// Generate a shipping label and return its PDF URL.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError::UnexpectedResponse` if no label is returned.
    #[instrument(skip(self))]
    pub async fn generate_label(&self, shipment_id: i64) -> Result<String, ShiprocketError> {
        let response: LabelResponse = self
            .post(
                "courier/generate/label",
                &ShipmentIds {
                    shipment_id: vec![shipment_id],
                },
            )
            .await?;
        match response.label_url {
            Some(url) if response.label_created == 1 && !url.is_empty() => Ok(url),
            _ => Err(ShiprocketError::UnexpectedResponse(
                response
                    .response
                    .unwrap_or_else(|| "label was not generated".to_owned()),
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Timelike;
    use stride_core::order::OrderTotals;
    use stride_core::{OrderId, OrderItemId, PaymentStatus, ProductId, UserId};

    use super::*;
    use crate::models::order::{OrderItem, PaymentInfo, ShipmentInfo, ShippingAddress};

    fn order() -> Order {
        let created_at = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
        Order {
            id: OrderId::new(42),
            order_number: "STR000042".to_owned(),
            user_id: UserId::new(1),
            customer_name: Some("Asha Menon".to_owned()),
            customer_email: Some("asha@example.in".to_owned()),
            status: OrderStatus::Confirmed,
            payment: PaymentInfo {
                method: PaymentMethod::Cod,
                status: PaymentStatus::Pending,
                gateway_order_id: None,
                transaction_id: None,
            },
            shipping_address: ShippingAddress {
                name: "Asha Menon".to_owned(),
                phone: "9876543210".to_owned(),
                email: None,
                line1: "12 MG Road".to_owned(),
                line2: None,
                city: "Bengaluru".to_owned(),
                state: "Karnataka".to_owned(),
                postal_code: "560001".to_owned(),
                country: "India".to_owned(),
            },
            shipment: ShipmentInfo::default(),
            items: vec![OrderItem {
                id: OrderItemId::new(1),
                product_id: ProductId::new(7),
                product_name: "Trail Runner".to_owned(),
                size: Some("9".to_owned()),
                color: Some("Black".to_owned()),
                quantity: 2,
                unit_price: Decimal::from(2499),
                line_total: Decimal::from(4998),
            }],
            totals: OrderTotals {
                subtotal: Decimal::from(4998),
                discount: Decimal::from(500),
                shipping: Decimal::ZERO,
                total: Decimal::from(4498),
            },
            coupon_code: Some("SAVE500".to_owned()),
            cancellation: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_map_carrier_status() {
        assert_eq!(map_carrier_status("DELIVERED"), Some(OrderStatus::Delivered));
        assert_eq!(map_carrier_status("In Transit"), Some(OrderStatus::Shipped));
        assert_eq!(map_carrier_status("OUT_FOR_DELIVERY"), Some(OrderStatus::Shipped));
        assert_eq!(map_carrier_status("RTO INITIATED"), None);
        assert_eq!(map_carrier_status("PICKUP SCHEDULED"), None);
    }

    #[test]
    fn test_build_order_request() {
        let request = build_order_request(&order(), "Primary", &PackageDimensions::default());
        assert_eq!(request.order_id, "STR000042");
        assert_eq!(request.order_date, "2025-06-01 09:30");
        assert_eq!(request.billing_customer_name, "Asha");
        assert_eq!(request.billing_last_name, "Menon");
        assert_eq!(request.billing_email, "asha@example.in");
        assert_eq!(request.payment_method, "COD");
        assert_eq!(request.weight, Decimal::new(18, 1));
        assert_eq!(request.order_items[0].sku, "STR-7-9");
        assert_eq!(request.order_items[0].name, "Trail Runner (Black, UK 9)");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["sub_total"], serde_json::json!(4998.0));
        assert_eq!(json["shipping_is_billing"], serde_json::json!(true));
    }

    #[test]
    fn test_prepaid_payment_method() {
        let mut o = order();
        o.payment.method = PaymentMethod::Online;
        let request = build_order_request(&o, "Primary", &PackageDimensions::default());
        assert_eq!(request.payment_method, "Prepaid");
    }

    #[test]
    fn test_parse_timestamp_ist() {
        let parsed = parse_timestamp("2025-06-02 15:30:00").unwrap();
        assert_eq!(parsed.hour(), 10);
        assert_eq!(parsed.minute(), 0);
        assert!(parse_timestamp("02 06 2025 15:30:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_timeline_is_chronological() {
        let json = r#"[
            {"date": "2025-06-03 11:00:00", "activity": "Delivered", "location": "Bengaluru", "sr-status-label": "DELIVERED"},
            {"date": "2025-06-02 08:00:00", "status": "IT", "activity": "In transit", "location": ""}
        ]"#;
        let activities: Vec<TrackActivity> = serde_json::from_str(json).unwrap();
        let events = timeline(&activities);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, "IT");
        assert_eq!(events[0].location, None);
        assert_eq!(events[1].status, "DELIVERED");
    }

    #[test]
    fn test_webhook_payload_event() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "awb": "19041424751540",
                "current_status": "OUT FOR DELIVERY",
                "order_id": "STR000042",
                "sr_order_id": 348456385,
                "current_timestamp": "2025-06-03 09:15:00",
                "scans": [{"date": "2025-06-03 09:15:00", "activity": "Out for delivery", "location": "Bengaluru Hub"}]
            }"#,
        )
        .unwrap();
        let event = payload.event().unwrap();
        assert_eq!(event.status, "OUT FOR DELIVERY");
        assert_eq!(event.location.as_deref(), Some("Bengaluru Hub"));
        assert_eq!(map_carrier_status(&event.status), Some(OrderStatus::Shipped));
    }

    #[test]
    fn test_webhook_payload_without_status() {
        let payload: WebhookPayload = serde_json::from_str(r#"{"awb": "1"}"#).unwrap();
        assert!(payload.event().is_none());
    }

    #[test]
    fn test_tracking_url() {
        assert_eq!(tracking_url("123"), "https://shiprocket.co/tracking/123");
    }
}

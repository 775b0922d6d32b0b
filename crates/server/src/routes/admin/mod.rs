//! Back-office API, mounted at `/api/admin`. Every handler requires a staff
//! session.
//!
//! ```text
//! GET    /orders                          - Order table
//! GET    /orders/{id}                     - Order detail
//! POST   /orders/{id}/advance             - Next status
//! PUT    /orders/{id}/status              - Chosen status
//! POST   /orders/{id}/cancel              - Cancel with reason
//! POST   /orders/{id}/shipment            - Create Shiprocket shipment
//! DELETE /orders/{id}/shipment            - Cancel shipment
//! POST   /orders/{id}/shipment/track      - Refresh tracking
//! POST   /orders/{id}/shipment/label      - Generate label
//!
//! GET    /products                        - Product table
//! POST   /products                        - Create product
//! GET    /products/{id}                   - Product
//! PUT    /products/{id}                   - Update product
//! DELETE /products/{id}                   - Delete product
//!
//! GET    /inventory                       - Stock table
//! PATCH  /inventory/{product_id}          - Inline stock edit
//! GET    /inventory/movements             - Ledger
//! POST   /inventory/movements             - Return / manual adjustment
//!
//! GET    /coupons                         - Coupons
//! POST   /coupons                         - Create
//! PUT    /coupons/{id}                    - Update
//! DELETE /coupons/{id}                    - Delete or deactivate
//!
//! GET    /filters, /banners               - All entries
//! POST   /filters, /banners               - Create
//! PUT    /filters/{id}, /banners/{id}     - Update
//! DELETE /filters/{id}, /banners/{id}     - Delete
//! PUT    /filters/order, /banners/order   - Reorder
//!
//! GET    /reviews                         - Moderation queue
//! PUT    /reviews/{id}/status             - Approve or reject
//! DELETE /reviews/{id}                    - Delete
//!
//! GET    /notifications                   - Broadcast history
//! POST   /notifications                   - Broadcast
//!
//! GET    /analytics/summary               - Revenue summary
//! GET    /analytics/orders-by-status      - Status counts
//! GET    /analytics/daily-revenue         - Daily series
//! GET    /analytics/top-products          - Best sellers
//! GET    /analytics/funnel                - Conversion funnel
//! GET    /analytics/devices               - Device breakdown
//!
//! GET    /settings                        - All settings
//! PUT    /settings/{key}                  - Upsert
//! DELETE /settings/{key}                  - Remove
//! ```

pub mod analytics;
pub mod content;
pub mod coupons;
pub mod inventory;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod settings;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::state::AppState;

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/advance", post(orders::advance))
        .route("/{id}/status", put(orders::update_status))
        .route("/{id}/cancel", post(orders::cancel))
        .route(
            "/{id}/shipment",
            post(orders::create_shipment).delete(orders::cancel_shipment),
        )
        .route("/{id}/shipment/track", post(orders::track))
        .route("/{id}/shipment/label", post(orders::generate_label))
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/inventory", get(inventory::index))
        .route(
            "/inventory/movements",
            get(inventory::movements).post(inventory::record_movement),
        )
        .route("/inventory/{product_id}", patch(inventory::update))
}

fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(coupons::index).post(coupons::create))
        .route(
            "/coupons/{id}",
            put(coupons::update).delete(coupons::delete),
        )
        .route(
            "/filters",
            get(content::filters).post(content::create_filter),
        )
        .route("/filters/order", put(content::reorder_filters))
        .route(
            "/filters/{id}",
            put(content::update_filter).delete(content::delete_filter),
        )
        .route(
            "/banners",
            get(content::banners).post(content::create_banner),
        )
        .route("/banners/order", put(content::reorder_banners))
        .route(
            "/banners/{id}",
            put(content::update_banner).delete(content::delete_banner),
        )
        .route("/reviews", get(content::reviews))
        .route("/reviews/{id}", axum::routing::delete(content::delete_review))
        .route("/reviews/{id}/status", put(content::moderate_review))
        .route("/settings", get(settings::index))
        .route(
            "/settings/{key}",
            put(settings::put).delete(settings::delete),
        )
}

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(notifications::history).post(notifications::broadcast),
        )
        .route("/analytics/summary", get(analytics::summary))
        .route("/analytics/orders-by-status", get(analytics::orders_by_status))
        .route("/analytics/daily-revenue", get(analytics::daily_revenue))
        .route("/analytics/top-products", get(analytics::top_products))
        .route("/analytics/funnel", get(analytics::funnel))
        .route("/analytics/devices", get(analytics::devices))
}

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/orders", order_routes())
        .merge(catalog_routes())
        .merge(content_routes())
        .merge(dashboard_routes())
}

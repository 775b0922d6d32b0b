//! End-to-end tests for the Stride API.
//!
//! The tests drive a running server over HTTP and are `#[ignore]`d by
//! default.
//!
//! ```bash
//! cargo run -p stride-cli -- migrate
//! cargo run -p stride-cli -- admin create -e qa@stride.shoes -n QA -p "$STRIDE_TEST_ADMIN_PASSWORD"
//! cargo run -p stride-server &
//! cargo test -p stride-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `STRIDE_TEST_URL` - server base URL (default `http://localhost:3000`)
//! - `STRIDE_TEST_ADMIN_EMAIL` / `STRIDE_TEST_ADMIN_PASSWORD` - staff login
//! - `DATABASE_URL` - for tests that inspect the ledger directly
//! - `SHIPROCKET_WEBHOOK_TOKEN` - for the webhook tests

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Server base URL.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STRIDE_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// `{base}/api{path}`.
#[must_use]
pub fn api(path: &str) -> String {
    format!("{}/api{path}", base_url())
}

/// Client that keeps the session cookie. Every client gets its own
/// forwarded IP so rate limits do not leak between tests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    let octet = Uuid::new_v4().as_bytes()[0];
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        reqwest::header::HeaderValue::from_str(&format!("198.51.100.{octet}"))
            .expect("valid header"),
    );
    Client::builder()
        .cookie_store(true)
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// Register a fresh customer and return the signed-in client with its email.
///
/// # Panics
///
/// Panics if registration fails.
pub async fn customer() -> (Client, String) {
    let client = client();
    let email = format!("it-{}@example.com", Uuid::new_v4().simple());
    let resp = client
        .post(api("/auth/register"))
        .json(&json!({
            "email": email,
            "password": "correct-horse-battery",
            "name": "Integration Customer",
        }))
        .send()
        .await
        .expect("register request");
    assert_eq!(resp.status(), StatusCode::CREATED);
    (client, email)
}

/// Sign in as the configured staff account.
///
/// # Panics
///
/// Panics if the credentials are missing or rejected.
pub async fn staff() -> Client {
    let email = std::env::var("STRIDE_TEST_ADMIN_EMAIL").expect("STRIDE_TEST_ADMIN_EMAIL not set");
    let password =
        std::env::var("STRIDE_TEST_ADMIN_PASSWORD").expect("STRIDE_TEST_ADMIN_PASSWORD not set");
    let client = client();
    let resp = client
        .post(api("/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("login request");
    assert_eq!(resp.status(), StatusCode::OK);
    client
}

/// Create an active sized product as staff and return it.
///
/// # Panics
///
/// Panics if the product cannot be created.
pub async fn create_product(staff: &Client, sizes: &[(&str, i32)]) -> Value {
    let name = format!("IT Runner {}", Uuid::new_v4().simple());
    let sizes: Vec<Value> = sizes
        .iter()
        .map(|(size, stock)| json!({ "size": size, "stock": stock }))
        .collect();
    let resp = staff
        .post(api("/admin/products"))
        .json(&json!({
            "name": name,
            "category": "running",
            "price": "2499.00",
            "sizes": sizes,
            "colors": ["Black"],
        }))
        .send()
        .await
        .expect("create product request");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("product json")
}

/// Place a one-line order with the given payment method and return the
/// whole checkout response.
///
/// # Panics
///
/// Panics if checkout fails.
pub async fn place_order(
    customer: &Client,
    product_id: i64,
    size: &str,
    quantity: i32,
    payment_method: &str,
) -> Value {
    let resp = customer
        .post(api("/checkout"))
        .json(&json!({
            "items": [{ "product_id": product_id, "size": size, "color": "Black", "quantity": quantity }],
            "payment_method": payment_method,
            "shipping_address": {
                "name": "Asha Menon",
                "phone": "9876543210",
                "line1": "14 MG Road",
                "city": "Bengaluru",
                "state": "Karnataka",
                "postal_code": "560001",
            },
        }))
        .send()
        .await
        .expect("checkout request");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("placed order json")
}

/// Place a cash-on-delivery order for one line and return the order.
///
/// # Panics
///
/// Panics if checkout fails.
pub async fn place_cod_order(customer: &Client, product_id: i64, size: &str, quantity: i32) -> Value {
    place_order(customer, product_id, size, quantity, "cod").await["order"].clone()
}

/// Ledger entries written for an order, oldest first, as
/// `(movement_type, quantity)`.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is missing or the query fails.
pub async fn order_movements(order_id: i64) -> Vec<(String, i32)> {
    let pool = sqlx::PgPool::connect(&std::env::var("DATABASE_URL").expect("DATABASE_URL"))
        .await
        .expect("database");
    sqlx::query_as(
        "SELECT movement_type::text, quantity FROM stock_movements
         WHERE order_id = $1 ORDER BY id",
    )
    .bind(i32::try_from(order_id).expect("order id fits"))
    .fetch_all(&pool)
    .await
    .expect("movements")
}

/// Aggregate stock of a product as staff sees it.
///
/// # Panics
///
/// Panics if the product cannot be read.
pub async fn product_stock(staff: &Client, product_id: i64) -> i64 {
    let product: Value = staff
        .get(api(&format!("/admin/products/{product_id}")))
        .send()
        .await
        .expect("product request")
        .json()
        .await
        .expect("product json");
    product["stock"].as_i64().expect("stock")
}

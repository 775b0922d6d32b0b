//! Back-office flows against a running server.

use reqwest::StatusCode;
use serde_json::{Value, json};

use stride_core::OrderStatus;
use stride_integration_tests::{
    api, create_product, customer, order_movements, place_cod_order, product_stock, staff,
};

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_customer_cannot_reach_admin() {
    let (customer, _) = customer().await;
    let resp = customer
        .get(api("/admin/orders"))
        .send()
        .await
        .expect("orders request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and staff credentials"]
async fn test_advance_and_invalid_transition() {
    let staff = staff().await;
    let product = create_product(&staff, &[("8", 3)]).await;
    let product_id = product["id"].as_i64().expect("product id");
    let (customer, _) = customer().await;
    let order = place_cod_order(&customer, product_id, "8", 1).await;
    let order_id = order["id"].as_i64().expect("order id");

    let advanced: Value = staff
        .post(api(&format!("/admin/orders/{order_id}/advance")))
        .send()
        .await
        .expect("advance request")
        .json()
        .await
        .expect("order json");
    assert_eq!(advanced["status"], OrderStatus::Processing.as_str());

    // Backwards is refused
    let resp = staff
        .put(api(&format!("/admin/orders/{order_id}/status")))
        .json(&json!({ "status": "confirmed" }))
        .send()
        .await
        .expect("status request");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server, staff credentials and DATABASE_URL"]
async fn test_staff_cancel_restocks_with_ledger_entry() {
    let staff = staff().await;
    let product = create_product(&staff, &[("9", 2)]).await;
    let product_id = product["id"].as_i64().expect("product id");
    let (customer, _) = customer().await;
    let order = place_cod_order(&customer, product_id, "9", 2).await;
    let order_id = order["id"].as_i64().expect("order id");

    let resp = staff
        .post(api(&format!("/admin/orders/{order_id}/cancel")))
        .json(&json!({ "reason": "Customer unreachable" }))
        .send()
        .await
        .expect("cancel request");
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(
        order_movements(order_id).await,
        vec![("sale".to_string(), -2), ("cancellation".to_string(), 2)]
    );
    assert_eq!(product_stock(&staff, product_id).await, 2);
}

#[tokio::test]
#[ignore = "Requires running server, staff credentials and DATABASE_URL"]
async fn test_status_cancelled_restocks() {
    let staff = staff().await;
    let product = create_product(&staff, &[("8", 3)]).await;
    let product_id = product["id"].as_i64().expect("product id");
    let (customer, _) = customer().await;
    let order = place_cod_order(&customer, product_id, "8", 1).await;
    let order_id = order["id"].as_i64().expect("order id");
    assert_eq!(product_stock(&staff, product_id).await, 2);

    let resp = staff
        .put(api(&format!("/admin/orders/{order_id}/status")))
        .json(&json!({ "status": "cancelled" }))
        .send()
        .await
        .expect("status request");
    assert_eq!(resp.status(), StatusCode::OK);
    let cancelled: Value = resp.json().await.expect("order json");
    assert_eq!(cancelled["status"], OrderStatus::Cancelled.as_str());
    assert_eq!(cancelled["cancellation"]["reason"], "Cancelled by store");

    assert_eq!(
        order_movements(order_id).await,
        vec![("sale".to_string(), -1), ("cancellation".to_string(), 1)]
    );
    assert_eq!(product_stock(&staff, product_id).await, 3);
}

#[tokio::test]
#[ignore = "Requires running server and staff credentials"]
async fn test_inline_stock_edit() {
    let staff = staff().await;
    let product = create_product(&staff, &[("6", 1), ("7", 1)]).await;
    let product_id = product["id"].as_i64().expect("product id");

    let resp = staff
        .patch(api(&format!("/admin/inventory/{product_id}")))
        .json(&json!({ "sizes": [{ "size": "6", "stock": 9 }], "note": "recount" }))
        .send()
        .await
        .expect("stock edit request");
    assert_eq!(resp.status(), StatusCode::OK);
    let row: Value = resp.json().await.expect("row json");
    assert_eq!(row["stock"], 10);

    let ledger: Value = staff
        .get(api(&format!(
            "/admin/inventory/movements?product_id={product_id}&movement_type=manual_adjustment"
        )))
        .send()
        .await
        .expect("ledger request")
        .json()
        .await
        .expect("ledger json");
    let notes: Vec<&str> = ledger["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|m| m["note"].as_str())
        .collect();
    assert!(notes.contains(&"recount"));
}

#[tokio::test]
#[ignore = "Requires running server and staff credentials"]
async fn test_theme_setting_validates_colours() {
    let staff = staff().await;
    let resp = staff
        .put(api("/admin/settings/theme"))
        .json(&json!({ "value": { "primary": "not-a-colour" } }))
        .send()
        .await
        .expect("settings request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and staff credentials"]
async fn test_dashboard_summary_shape() {
    let staff = staff().await;
    let summary: Value = staff
        .get(api("/admin/analytics/summary"))
        .send()
        .await
        .expect("summary request")
        .json()
        .await
        .expect("summary json");
    assert!(summary.get("gross_revenue").is_some());
    assert!(summary.get("average_order_value").is_some());

    let resp = staff
        .get(api("/admin/analytics/summary?from=2026-03-10&to=2026-03-01"))
        .send()
        .await
        .expect("summary request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

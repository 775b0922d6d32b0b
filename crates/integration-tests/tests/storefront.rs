//! Storefront flows against a running server.
//!
//! Run with: `cargo test -p stride-integration-tests -- --ignored`

use reqwest::StatusCode;
use serde_json::{Value, json};

use stride_core::OrderStatus;
use stride_integration_tests::{
    api, base_url, client, create_product, customer, order_movements, place_cod_order, place_order,
    product_stock, staff,
};

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("health request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_register_login_me_logout() {
    let (client, email) = customer().await;

    let me: Value = client
        .get(api("/auth/me"))
        .send()
        .await
        .expect("me request")
        .json()
        .await
        .expect("me json");
    assert_eq!(me["email"], email);
    assert_eq!(me["role"], "customer");

    let resp = client.post(api("/auth/logout")).send().await.expect("logout");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client.get(api("/auth/me")).send().await.expect("me request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_duplicate_registration_conflicts() {
    let (_, email) = customer().await;
    let resp = client()
        .post(api("/auth/register"))
        .json(&json!({ "email": email, "password": "another-long-password" }))
        .send()
        .await
        .expect("register request");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server and staff credentials"]
async fn test_cart_quote_and_cod_checkout() {
    let staff = staff().await;
    let product = create_product(&staff, &[("8", 5), ("9", 3)]).await;
    let product_id = product["id"].as_i64().expect("product id");

    let (customer, _) = customer().await;
    let resp = customer
        .post(api("/cart/items"))
        .json(&json!({ "product_id": product_id, "size": "8", "color": "Black", "quantity": 2 }))
        .send()
        .await
        .expect("add to cart");
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.expect("cart json");
    assert_eq!(cart["item_count"], 2);

    let quote: Value = customer
        .post(api("/checkout/quote"))
        .json(&json!({}))
        .send()
        .await
        .expect("quote request")
        .json()
        .await
        .expect("quote json");
    assert_eq!(quote["lines"].as_array().map(Vec::len), Some(1));

    let order = place_cod_order(&customer, product_id, "8", 2).await;
    assert_eq!(order["status"], OrderStatus::Confirmed.as_str());
    assert_eq!(order["payment"]["method"], "cod");
}

#[tokio::test]
#[ignore = "Requires running server and staff credentials"]
async fn test_checkout_refuses_more_than_stock() {
    let staff = staff().await;
    let product = create_product(&staff, &[("10", 1)]).await;
    let product_id = product["id"].as_i64().expect("product id");

    let (customer, _) = customer().await;
    let resp = customer
        .post(api("/checkout"))
        .json(&json!({
            "items": [{ "product_id": product_id, "size": "10", "color": "Black", "quantity": 2 }],
            "payment_method": "cod",
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
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server and staff credentials"]
async fn test_customer_cancels_confirmed_order() {
    let staff = staff().await;
    let product = create_product(&staff, &[("7", 4)]).await;
    let product_id = product["id"].as_i64().expect("product id");

    let (customer, _) = customer().await;
    let order = place_cod_order(&customer, product_id, "7", 1).await;
    let order_id = order["id"].as_i64().expect("order id");

    let resp = customer
        .post(api(&format!("/orders/{order_id}/cancel")))
        .json(&json!({ "reason": "Ordered the wrong size" }))
        .send()
        .await
        .expect("cancel request");
    assert_eq!(resp.status(), StatusCode::OK);
    let cancelled: Value = resp.json().await.expect("order json");
    assert_eq!(cancelled["status"], OrderStatus::Cancelled.as_str());
    assert_eq!(cancelled["cancellation"]["reason"], "Ordered the wrong size");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_unknown_coupon_is_reported_not_raised() {
    let (customer, _) = customer().await;
    let resp = customer
        .post(api("/coupons/validate"))
        .json(&json!({ "code": "NOPE-NOT-REAL", "subtotal": "1500" }))
        .send()
        .await
        .expect("validate request");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("validation json");
    assert_eq!(body["valid"], false);
}

#[tokio::test]
#[ignore = "Requires running server with Razorpay configured, staff credentials and DATABASE_URL"]
async fn test_bad_payment_signature_cancels_and_restocks() {
    let staff = staff().await;
    let product = create_product(&staff, &[("9", 4)]).await;
    let product_id = product["id"].as_i64().expect("product id");

    let (customer, _) = customer().await;
    let placed = place_order(&customer, product_id, "9", 3, "online").await;
    let order_id = placed["order"]["id"].as_i64().expect("order id");
    assert_eq!(placed["order"]["status"], OrderStatus::PendingPayment.as_str());
    let gateway_order_id = placed["payment"]["gateway_order_id"]
        .as_str()
        .expect("gateway order id")
        .to_string();
    assert_eq!(product_stock(&staff, product_id).await, 1);

    let resp = customer
        .post(api(&format!("/orders/{order_id}/verify-payment")))
        .json(&json!({
            "razorpay_order_id": gateway_order_id,
            "razorpay_payment_id": "pay_forged0000001",
            "razorpay_signature": "00".repeat(32),
        }))
        .send()
        .await
        .expect("verify request");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let order: Value = customer
        .get(api(&format!("/orders/{order_id}")))
        .send()
        .await
        .expect("order request")
        .json()
        .await
        .expect("order json");
    assert_eq!(order["status"], OrderStatus::Cancelled.as_str());
    assert_eq!(order["payment"]["status"], "failed");

    assert_eq!(
        order_movements(order_id).await,
        vec![("sale".to_string(), -3), ("payment_failed".to_string(), 3)]
    );
    assert_eq!(product_stock(&staff, product_id).await, 4);
}

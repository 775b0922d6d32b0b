//! Shiprocket webhook authentication.

use reqwest::StatusCode;
use serde_json::{Value, json};

use stride_integration_tests::{api, client};

fn payload() -> Value {
    json!({
        "awb": "00000000000000",
        "current_status": "IN TRANSIT",
        "current_timestamp": "2026-03-01 10:15:00",
        "scans": [],
    })
}

#[tokio::test]
#[ignore = "Requires running server with Shiprocket configured"]
async fn test_webhook_rejects_bad_token() {
    let resp = client()
        .post(api("/webhooks/shiprocket"))
        .header("x-api-key", "definitely-wrong")
        .json(&payload())
        .send()
        .await
        .expect("webhook request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server with Shiprocket configured"]
async fn test_webhook_acknowledges_unknown_shipment() {
    let token = std::env::var("SHIPROCKET_WEBHOOK_TOKEN").expect("SHIPROCKET_WEBHOOK_TOKEN");
    let resp = client()
        .post(api("/webhooks/shiprocket"))
        .header("x-api-key", token)
        .json(&payload())
        .send()
        .await
        .expect("webhook request");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("ack json");
    assert_eq!(body["matched"], false);
}

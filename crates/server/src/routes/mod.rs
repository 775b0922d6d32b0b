//! HTTP route handlers.
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Database reachable
//! /api/...                          - Storefront API (see `storefront`)
//! /api/admin/...                    - Back-office API (see `admin`)
//! POST /api/webhooks/shiprocket     - Carrier tracking push
//! ```

pub mod admin;
pub mod storefront;
pub mod webhooks;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use crate::db::Pagination;
use crate::middleware::rate_limit::{RateLimitConfigError, webhook_rate_limiter};
use crate::state::AppState;

/// `?page=&per_page=` for plain paged listings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    #[must_use]
    pub fn pagination(self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

fn webhook_routes() -> Result<Router<AppState>, RateLimitConfigError> {
    Ok(Router::new()
        .route("/shiprocket", post(webhooks::shiprocket))
        .layer(webhook_rate_limiter()?))
}

/// All routes, without the session and HTTP layers.
///
/// # Errors
///
/// Returns `RateLimitConfigError` if a rate limiter cannot be built.
pub fn routes() -> Result<Router<AppState>, RateLimitConfigError> {
    let api = storefront::router()?
        .nest("/admin", admin::router())
        .nest("/webhooks", webhook_routes()?);

    Ok(Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use secrecy::SecretString;
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::config::{ExpoConfig, ServerConfig, ShiprocketConfig, StoreConfig};

    use super::*;

    const WEBHOOK_TOKEN: &str = "sr-hook-7f3a9c1e5b2d";

    fn config(shiprocket: Option<ShiprocketConfig>) -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from("postgres://stride@localhost/stride_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            cors_origins: Vec::new(),
            store: StoreConfig::default(),
            shiprocket,
            razorpay: None,
            expo: ExpoConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    fn app(config: ServerConfig) -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://stride@localhost/stride_test")
            .unwrap();
        let state = AppState::new(config, pool).unwrap();
        crate::app(state).unwrap()
    }

    fn with_shiprocket() -> ServerConfig {
        config(Some(ShiprocketConfig {
            email: "ops@stride.shoes".to_string(),
            password: SecretString::from("unused"),
            pickup_location: "Primary".to_string(),
            webhook_token: Some(SecretString::from(WEBHOOK_TOKEN)),
        }))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.10")
            .body(Body::empty())
            .unwrap()
    }

    fn webhook_request(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/webhooks/shiprocket")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.11");
        if let Some(token) = token {
            builder = builder.header("x-api-key", token);
        }
        builder
            .body(Body::from(r#"{"awb":"1234567890","current_status":"DELIVERED"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(config(None)).oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_admin_requires_session() {
        let response = app(config(None))
            .oneshot(get_request("/api/admin/orders"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"], "sign in required");
    }

    #[tokio::test]
    async fn test_cart_requires_session() {
        let response = app(config(None))
            .oneshot(get_request("/api/cart"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_my_orders_requires_session() {
        let response = app(config(None))
            .oneshot(get_request("/api/orders"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = app(config(None))
            .oneshot(get_request("/api/nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_webhook_without_configuration_is_unavailable() {
        let response = app(config(None))
            .oneshot(webhook_request(Some(WEBHOOK_TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_webhook_rejects_missing_token() {
        let response = app(with_shiprocket())
            .oneshot(webhook_request(None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_webhook_rejects_wrong_token() {
        let response = app(with_shiprocket())
            .oneshot(webhook_request(Some("sr-hook-0000000000000")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_page_query_defaults() {
        let pagination = PageQuery::default().pagination();
        assert_eq!(pagination, Pagination::new(None, None));
    }
}

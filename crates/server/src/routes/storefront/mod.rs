//! Storefront API, mounted at `/api`.
//!
//! ```text
//! POST   /auth/register              - Create account and sign in
//! POST   /auth/login                 - Sign in
//! POST   /auth/logout                - Sign out
//! GET    /auth/me                    - Current user
//!
//! GET    /products                   - Product listing with filters
//! GET    /products/{slug}            - Product page with approved reviews
//! POST   /products/{slug}/reviews    - Submit a review (auth)
//! GET    /categories                 - Category names
//! GET    /filters                    - Active filter facets
//! GET    /banners                    - Live banners
//! GET    /site-config                - Theme and site settings
//!
//! GET    /cart                       - Cart (auth)
//! POST   /cart/items                 - Add line
//! PATCH  /cart/items/{id}            - Set quantity
//! DELETE /cart/items/{id}            - Remove line
//! DELETE /cart                       - Empty cart
//!
//! POST   /checkout/quote             - Totals for cart or items
//! POST   /checkout                   - Place order
//! POST   /orders/{id}/verify-payment - Razorpay signature check
//! GET    /orders                     - Own orders
//! GET    /orders/{id}                - Own order
//! POST   /orders/{id}/cancel         - Cancel own order
//!
//! POST   /coupons/validate           - Check a coupon code
//! POST   /push-tokens                - Register device
//! DELETE /push-tokens                - Unregister device
//! POST   /events                     - Analytics event
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod coupons;
pub mod events;
pub mod orders;
pub mod products;
pub mod push;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::middleware::rate_limit::{
    RateLimitConfigError, auth_rate_limiter, checkout_rate_limiter,
};
use crate::state::AppState;

fn auth_routes() -> Result<Router<AppState>, RateLimitConfigError> {
    let limited = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter()?);

    Ok(Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .merge(limited))
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route("/products/{slug}/reviews", post(products::submit_review))
        .route("/categories", get(products::categories))
        .route("/filters", get(products::filters))
        .route("/banners", get(products::banners))
        .route("/site-config", get(products::site_config))
}

fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{id}", patch(cart::update).delete(cart::remove))
}

fn order_routes() -> Result<Router<AppState>, RateLimitConfigError> {
    let limited = Router::new()
        .route("/checkout", post(checkout::place_order))
        .route("/orders/{id}/verify-payment", post(checkout::verify_payment))
        .layer(checkout_rate_limiter()?);

    Ok(Router::new()
        .route("/checkout/quote", post(checkout::quote))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .merge(limited))
}

/// Build the storefront router.
///
/// # Errors
///
/// Returns `RateLimitConfigError` if a rate limiter cannot be built.
pub fn router() -> Result<Router<AppState>, RateLimitConfigError> {
    Ok(Router::new()
        .nest("/auth", auth_routes()?)
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .merge(order_routes()?)
        .route("/coupons/validate", post(coupons::validate))
        .route(
            "/push-tokens",
            post(push::register).delete(push::unregister),
        )
        .route("/events", post(events::record)))
}

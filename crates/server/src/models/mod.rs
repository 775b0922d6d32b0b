//! Domain models and request/response types for the API.
//!
//! Rows are converted into these types inside the repositories; handlers
//! never see `sqlx` row structs.

pub mod analytics;
pub mod banner;
pub mod cart;
pub mod checkout;
pub mod coupon;
pub mod filter;
pub mod inventory;
pub mod notification;
pub mod order;
pub mod product;
pub mod review;
pub mod session;
pub mod settings;
pub mod user;

pub use session::{CurrentUser, session_keys};

/// Trim a string and turn blank input into `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

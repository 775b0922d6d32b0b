//! Business logic between the route handlers and the repositories.
//!
//! # Services
//!
//! - `auth` - Registration, login and password hashing
//! - `catalog` - Product pages and admin product management
//! - `inventory` - Stock edits and the movement ledger
//! - `checkout` - Quotes, order placement and payment verification
//! - `orders` - Status changes, cancellation and the Shiprocket flow
//! - `coupons` - Coupon administration and validation
//! - `payments` - Razorpay signature checks
//! - `content` - Site settings, filters, banners and reviews
//! - `notifications` - Push devices and broadcasts
//! - `analytics` - Event ingestion and dashboards

pub mod analytics;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod content;
pub mod coupons;
pub mod inventory;
pub mod notifications;
pub mod orders;
pub mod payments;

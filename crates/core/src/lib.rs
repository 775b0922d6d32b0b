//! Stride Core - shared domain types and rules.
//!
//! This crate is used by every Stride component:
//! - `server` - Storefront and back-office REST API
//! - `cli` - Migrations, admin bootstrap and catalog seeding
//!
//! # Architecture
//!
//! The core crate holds types and pure business rules only: no I/O, no
//! database access, no HTTP clients. Anything that decides *whether* an
//! operation is allowed (order transitions, coupon eligibility, stock
//! availability) lives here so it can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email, money, status enums
//! - [`order`] - Order status state machine and totals
//! - [`coupon`] - Coupon eligibility and discount calculation
//! - [`inventory`] - Stock levels, per-size stock and movement planning
//! - [`analytics`] - User agent classification and funnel math

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod coupon;
pub mod inventory;
pub mod order;
pub mod types;

pub use types::*;

//! Gym booking HTTP API service.
//!
//! This crate provides the booking engine facade and its HTTP API:
//!
//! - Recurring templates, occurrence generation, and one-off occurrences
//! - Bookings and cancellations with credit debit and refund
//! - Credit ledger history, purchases, and staff adjustments
//! - Availability grids for members and staff
//! - Booking notifications over a signed webhook
//!
//! # Authentication
//!
//! The service supports two kinds of caller:
//!
//! 1. **Members** - identified by `x-member-id`, set by the upstream gateway
//! 2. **Staff** - authenticated by the `x-api-key` header

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)]

pub mod auth;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use engine::{Engine, EngineSettings};
pub use error::ApiError;
pub use notify::{LogNotifier, Notification, Notifier, Recipient, WebhookNotifier};
pub use routes::create_router;
pub use state::AppState;

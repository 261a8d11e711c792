//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, availability, bookings, credits, health, settings};
use crate::state::AppState;

/// Maximum concurrent requests for the API.
///
/// Store calls run on the blocking pool; this keeps a burst from queueing
/// more work there than the row-lock timeout can absorb.
const API_MAX_CONCURRENT_REQUESTS: usize = 256;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/settings/timezone` - Gym timezone and local date
///
/// ## Member (`x-member-id`)
/// - `POST /v1/bookings` - Book an occurrence
/// - `GET /v1/bookings` - List own bookings
/// - `DELETE /v1/bookings/:id` - Cancel own booking
/// - `GET /v1/credits/balance` - Credit balance
/// - `GET /v1/credits/entries` - Ledger history
/// - `GET /v1/availability` - Anonymised availability grid
///
/// ## Staff (`x-api-key`)
/// - `POST|GET /v1/admin/templates`, `GET|DELETE /v1/admin/templates/:id`
/// - `POST /v1/admin/templates/:id/generate`, `POST /v1/admin/generate`
/// - `POST|GET /v1/admin/occurrences`, `GET /v1/admin/occurrences/:id/bookings`
/// - `DELETE /v1/admin/bookings/:id`
/// - `POST /v1/admin/credits/grant`, `POST /v1/admin/credits/adjust`
/// - `POST|GET /v1/admin/blocks`, `DELETE /v1/admin/blocks/:id`
/// - `GET /v1/admin/availability` - Labelled availability grid
/// - `PUT /v1/settings/timezone` - Change the gym timezone
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let admin_routes = Router::new()
        // Templates
        .route(
            "/templates",
            post(admin::create_template).get(admin::list_templates),
        )
        .route(
            "/templates/:id",
            get(admin::get_template).delete(admin::delete_template),
        )
        .route("/templates/:id/generate", post(admin::generate_template))
        .route("/generate", post(admin::generate_all))
        // Occurrences
        .route(
            "/occurrences",
            post(admin::create_occurrence).get(admin::list_occurrences),
        )
        .route("/occurrences/:id/bookings", get(admin::occurrence_roster))
        .route("/bookings/:id", delete(admin::staff_cancel_booking))
        // Credits
        .route("/credits/grant", post(admin::grant_credits))
        .route("/credits/adjust", post(admin::adjust_credits))
        // Blocks
        .route("/blocks", post(admin::create_block).get(admin::list_blocks))
        .route("/blocks/:id", delete(admin::delete_block))
        // Availability
        .route("/availability", get(availability::admin_availability));

    let api_routes = Router::new()
        // Bookings
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route("/bookings/:id", delete(bookings::cancel_booking))
        // Credits
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/entries", get(credits::list_entries))
        // Availability
        .route("/availability", get(availability::member_availability))
        // Settings
        .route(
            "/settings/timezone",
            get(settings::get_timezone).put(settings::set_timezone),
        )
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

//! Gym booking service - HTTP API for scheduling, bookings, and credits.
//!
//! This is the main entry point for the gym-booking service.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gym_service::{create_router, AppState, ServiceConfig};
use gym_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gym=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gym booking service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        default_timezone = %config.default_timezone,
        staff_key_configured = %config.staff_api_key.is_some(),
        webhook_configured = %config.notify_webhook_url.is_some(),
        "Service configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open_with_lock_timeout(
        &config.data_dir,
        Duration::from_millis(config.lock_timeout_ms),
    )?);

    // Build app state
    let state = AppState::new(store, config.clone());
    let timezone = state.engine.init_timezone().await?;
    tracing::info!(timezone = %timezone.name(), "Gym timezone resolved");

    // Create the router
    let app = create_router(state);

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

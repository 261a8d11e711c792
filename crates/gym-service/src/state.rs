//! Application state.

use std::sync::Arc;

use gym_core::{parse_timezone, Clock, SystemClock};
use gym_store::Store;

use crate::config::ServiceConfig;
use crate::engine::{Engine, EngineSettings};
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The booking engine.
    pub engine: Arc<Engine>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create the production state: system clock, webhook notifier if configured.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let notifier: Arc<dyn Notifier> = match config.notify_webhook_url.as_deref() {
            Some(url) => match WebhookNotifier::new(url, config.notify_webhook_secret.clone()) {
                Ok(notifier) => {
                    tracing::info!(
                        signed = config.notify_webhook_secret.is_some(),
                        "Webhook notifications enabled"
                    );
                    Arc::new(notifier)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create webhook notifier");
                    Arc::new(LogNotifier)
                }
            },
            None => {
                tracing::warn!("Notification webhook not configured - notifications will be logged only");
                Arc::new(LogNotifier)
            }
        };

        Self::with_parts(store, Arc::new(SystemClock), notifier, config)
    }

    /// Create state from explicit parts.
    #[must_use]
    pub fn with_parts(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        config: ServiceConfig,
    ) -> Self {
        let default_timezone = parse_timezone(&config.default_timezone).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid GYM_TIMEZONE, falling back to UTC");
            chrono_tz::UTC
        });
        let settings = EngineSettings {
            default_timezone,
            weeks_ahead: config.generate_weeks_ahead,
            grid: config.grid,
        };

        Self {
            engine: Arc::new(Engine::new(store, clock, notifier, settings)),
            config,
        }
    }
}

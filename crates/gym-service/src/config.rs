//! Service configuration.

use std::path::Path;

use chrono::NaiveTime;
use gym_core::GridShape;
use serde::Deserialize;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/gym-booking").
    pub data_dir: String,

    /// IANA timezone stored on first start if none is stored yet (default: "UTC").
    pub default_timezone: String,

    /// API key required in `x-api-key` for staff routes.
    pub staff_api_key: Option<String>,

    /// Notification webhook URL (optional).
    pub notify_webhook_url: Option<String>,

    /// Secret used to sign notification bodies (optional).
    pub notify_webhook_secret: Option<String>,

    /// Weeks generated when a request does not say (default: 8).
    pub generate_weeks_ahead: u32,

    /// Availability grid hours and cell length.
    pub grid: GridShape,

    /// Row-lock wait in milliseconds before a request fails as busy.
    pub lock_timeout_ms: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Notification secrets file structure.
#[derive(Debug, Deserialize)]
struct NotifySecrets {
    webhook_url: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let (notify_webhook_url, notify_webhook_secret) = load_notify_secrets();
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            default_timezone: std::env::var("GYM_TIMEZONE").unwrap_or(defaults.default_timezone),
            staff_api_key: std::env::var("STAFF_API_KEY").ok(),
            notify_webhook_url,
            notify_webhook_secret,
            generate_weeks_ahead: env_parse("GENERATE_WEEKS_AHEAD")
                .unwrap_or(defaults.generate_weeks_ahead),
            grid: grid_from_env().unwrap_or(defaults.grid),
            lock_timeout_ms: env_parse("LOCK_TIMEOUT_MS").unwrap_or(defaults.lock_timeout_ms),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Build the grid shape from `GRID_OPEN`, `GRID_CLOSE`, `GRID_SLOT_MINUTES`.
///
/// Returns `None` (and the caller falls back to defaults) when the
/// combination does not validate.
fn grid_from_env() -> Option<GridShape> {
    let defaults = GridShape::default();
    let open = std::env::var("GRID_OPEN")
        .ok()
        .and_then(|v| parse_clock_time(&v))
        .unwrap_or(defaults.open);
    let close = std::env::var("GRID_CLOSE")
        .ok()
        .and_then(|v| parse_clock_time(&v))
        .unwrap_or(defaults.close);
    let slot_minutes = env_parse("GRID_SLOT_MINUTES").unwrap_or(defaults.slot_minutes);

    match GridShape::new(open, close, slot_minutes) {
        Ok(shape) => Some(shape),
        Err(e) => {
            tracing::warn!(error = %e, "Invalid availability grid settings, using defaults");
            None
        }
    }
}

/// Load notification webhook settings from file or environment.
fn load_notify_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [".secrets/notify.json", "../.secrets/notify.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<NotifySecrets>(path) {
            tracing::info!(path = %path, "Loaded notification secrets from file");
            return (Some(secrets.webhook_url), secrets.webhook_secret);
        }
    }

    tracing::debug!("Notification secrets file not found, using environment variables");
    (
        std::env::var("NOTIFY_WEBHOOK_URL").ok(),
        std::env::var("NOTIFY_WEBHOOK_SECRET").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/gym-booking".into(),
            default_timezone: "UTC".into(),
            staff_api_key: None,
            notify_webhook_url: None,
            notify_webhook_secret: None,
            generate_weeks_ahead: 8,
            grid: GridShape::default(),
            lock_timeout_ms: 5000,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

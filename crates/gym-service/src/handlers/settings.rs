//! Gym settings handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::StaffAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Timezone response.
#[derive(Debug, Serialize)]
pub struct TimezoneResponse {
    /// IANA timezone name.
    pub timezone: String,
    /// Gym-local date right now.
    pub today: chrono::NaiveDate,
}

/// Get the gym timezone.
pub async fn get_timezone(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimezoneResponse>, ApiError> {
    let at = state.engine.gym_time().await?;
    Ok(Json(TimezoneResponse {
        timezone: at.timezone().name().to_string(),
        today: at.today(),
    }))
}

/// Set timezone request.
#[derive(Debug, Deserialize)]
pub struct SetTimezoneRequest {
    /// IANA timezone name, e.g. `Europe/Berlin`.
    pub timezone: String,
}

/// Change the gym timezone.
pub async fn set_timezone(
    State(state): State<Arc<AppState>>,
    auth: StaffAuth,
    Json(request): Json<SetTimezoneRequest>,
) -> Result<Json<TimezoneResponse>, ApiError> {
    state.engine.set_timezone(&request.timezone).await?;
    tracing::info!(staff_id = %auth.staff_id, timezone = %request.timezone, "Timezone updated");

    let at = state.engine.gym_time().await?;
    Ok(Json(TimezoneResponse {
        timezone: at.timezone().name().to_string(),
        today: at.today(),
    }))
}

//! Availability grid handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;

use gym_core::{Availability, AvailabilityQuery, View};

use crate::auth::{MemberAuth, StaffAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Anonymised grid for members. Any `view` in the query is ignored.
pub async fn member_availability(
    State(state): State<Arc<AppState>>,
    _auth: MemberAuth,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Availability>, ApiError> {
    let query = AvailabilityQuery {
        view: View::Member,
        ..query
    };
    Ok(Json(state.engine.availability(query).await?))
}

/// Labelled grid for staff.
pub async fn admin_availability(
    State(state): State<Arc<AppState>>,
    _auth: StaffAuth,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Availability>, ApiError> {
    let query = AvailabilityQuery {
        view: View::Admin,
        ..query
    };
    Ok(Json(state.engine.availability(query).await?))
}

//! Member booking handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use gym_core::{Booking, BookingReceipt, CancellationReceipt, OccurrenceId};

use crate::auth::MemberAuth;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::state::AppState;

/// Book request.
#[derive(Debug, Deserialize)]
pub struct BookRequest {
    /// Occurrence to book.
    pub occurrence_id: OccurrenceId,
}

/// Book one seat, spending one credit.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    auth: MemberAuth,
    Json(request): Json<BookRequest>,
) -> Result<Json<BookingReceipt>, ApiError> {
    let receipt = state
        .engine
        .book(auth.member_id, request.occurrence_id)
        .await?;
    Ok(Json(receipt))
}

/// Cancel one of the member's bookings and refund the credit.
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    auth: MemberAuth,
    Path(booking_id): Path<String>,
) -> Result<Json<CancellationReceipt>, ApiError> {
    let booking_id = parse_id(&booking_id)?;
    let receipt = state.engine.cancel(auth.member_id, booking_id).await?;
    Ok(Json(receipt))
}

/// List bookings response.
#[derive(Debug, Serialize)]
pub struct ListBookingsResponse {
    /// Bookings, oldest first.
    pub bookings: Vec<Booking>,
}

/// List the member's bookings.
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    auth: MemberAuth,
) -> Result<Json<ListBookingsResponse>, ApiError> {
    let bookings = state.engine.member_bookings(auth.member_id).await?;
    Ok(Json(ListBookingsResponse { bookings }))
}

//! Staff handlers: templates, generation, occurrences, cancellations,
//! credits, and unavailable blocks.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use gym_core::{
    BlockId, Booking, CancellationReceipt, GenerationReport, LedgerEntry, MemberId, Occurrence,
    OccurrenceId, OccurrenceView, OfferingId, RecurringTemplate, SessionKind, TemplateId,
    TrainerId, UnavailableBlock, WeekdaySet,
};

use crate::auth::StaffAuth;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::state::AppState;

// ============================================================================
// Templates
// ============================================================================

/// Create template request.
#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    /// Display name.
    pub name: String,
    /// Assigned trainer.
    #[serde(default)]
    pub trainer_id: Option<TrainerId>,
    /// Class or personal training.
    pub kind: SessionKind,
    /// Weekdays, 0 = Sunday.
    pub weekdays: WeekdaySet,
    /// Gym-local start time.
    pub start_time: NaiveTime,
    /// Length in minutes.
    pub duration_minutes: u32,
    /// Seats per occurrence.
    pub capacity: u32,
}

/// Create a recurring template.
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    auth: StaffAuth,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<Json<RecurringTemplate>, ApiError> {
    let template = RecurringTemplate::new(
        request.name,
        request.trainer_id,
        request.kind,
        request.weekdays,
        request.start_time,
        request.duration_minutes,
        request.capacity,
    )?;
    tracing::debug!(staff_id = %auth.staff_id, "Creating template");
    Ok(Json(state.engine.create_template(template).await?))
}

/// List templates response.
#[derive(Debug, Serialize)]
pub struct ListTemplatesResponse {
    /// Templates.
    pub templates: Vec<RecurringTemplate>,
}

/// List templates.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    _auth: StaffAuth,
) -> Result<Json<ListTemplatesResponse>, ApiError> {
    let templates = state.engine.list_templates().await?;
    Ok(Json(ListTemplatesResponse { templates }))
}

/// Get a template.
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    _auth: StaffAuth,
    Path(template_id): Path<String>,
) -> Result<Json<RecurringTemplate>, ApiError> {
    let template_id = parse_id(&template_id)?;
    Ok(Json(state.engine.get_template(template_id).await?))
}

/// Delete template response.
#[derive(Debug, Serialize)]
pub struct DeleteTemplateResponse {
    /// Deleted template.
    pub template_id: TemplateId,
    /// Occurrences removed with it.
    pub occurrences_removed: usize,
}

/// Delete a template and its occurrences. Rejected while any are booked.
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    auth: StaffAuth,
    Path(template_id): Path<String>,
) -> Result<Json<DeleteTemplateResponse>, ApiError> {
    let template_id = parse_id(&template_id)?;
    let occurrences_removed = state.engine.delete_template(template_id).await?;
    tracing::info!(staff_id = %auth.staff_id, template_id = %template_id, "Template removed by staff");
    Ok(Json(DeleteTemplateResponse {
        template_id,
        occurrences_removed,
    }))
}

// ============================================================================
// Generation
// ============================================================================

/// Generation query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuery {
    /// Weeks ahead of gym-local today (default from configuration, max 52).
    #[serde(default)]
    pub weeks_ahead: Option<u32>,
}

/// Expand one template.
pub async fn generate_template(
    State(state): State<Arc<AppState>>,
    _auth: StaffAuth,
    Path(template_id): Path<String>,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<GenerationReport>, ApiError> {
    let template_id = parse_id(&template_id)?;
    Ok(Json(
        state
            .engine
            .generate(template_id, query.weeks_ahead)
            .await?,
    ))
}

/// Generate-all response.
#[derive(Debug, Serialize)]
pub struct GenerateAllResponse {
    /// One report per template.
    pub reports: Vec<GenerationReport>,
}

/// Expand every template.
pub async fn generate_all(
    State(state): State<Arc<AppState>>,
    _auth: StaffAuth,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<GenerateAllResponse>, ApiError> {
    let reports = state.engine.generate_all(query.weeks_ahead).await?;
    Ok(Json(GenerateAllResponse { reports }))
}

// ============================================================================
// Occurrences
// ============================================================================

/// Create one-off occurrence request.
#[derive(Debug, Deserialize)]
pub struct CreateOccurrenceRequest {
    /// Offering in the external catalog.
    pub offering_id: OfferingId,
    /// Class or personal training.
    pub kind: SessionKind,
    /// Assigned trainer.
    #[serde(default)]
    pub trainer_id: Option<TrainerId>,
    /// Gym-local date.
    pub date: NaiveDate,
    /// Gym-local start time.
    pub start_time: NaiveTime,
    /// Length in minutes.
    pub duration_minutes: u32,
    /// Seats.
    pub capacity: u32,
}

/// Create a one-off occurrence.
pub async fn create_occurrence(
    State(state): State<Arc<AppState>>,
    _auth: StaffAuth,
    Json(request): Json<CreateOccurrenceRequest>,
) -> Result<Json<Occurrence>, ApiError> {
    let occurrence = Occurrence::one_off(
        request.offering_id,
        request.kind,
        request.trainer_id,
        request.date,
        request.start_time,
        request.duration_minutes,
        request.capacity,
    )?;
    Ok(Json(state.engine.create_one_off(occurrence).await?))
}

/// Occurrence list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListOccurrencesQuery {
    /// First date.
    pub from: NaiveDate,
    /// First date after the range.
    pub until: NaiveDate,
}

/// List occurrences response.
#[derive(Debug, Serialize)]
pub struct ListOccurrencesResponse {
    /// Occurrences by date and start time.
    pub occurrences: Vec<OccurrenceView>,
}

/// List occurrences in `[from, until)`.
pub async fn list_occurrences(
    State(state): State<Arc<AppState>>,
    _auth: StaffAuth,
    Query(query): Query<ListOccurrencesQuery>,
) -> Result<Json<ListOccurrencesResponse>, ApiError> {
    let occurrences = state
        .engine
        .list_occurrences(query.from, query.until)
        .await?;
    Ok(Json(ListOccurrencesResponse { occurrences }))
}

/// Roster response.
#[derive(Debug, Serialize)]
pub struct RosterResponse {
    /// The occurrence with its booked count.
    pub occurrence: OccurrenceView,
    /// Bookings, oldest first.
    pub bookings: Vec<Booking>,
}

/// Bookings held for an occurrence.
pub async fn occurrence_roster(
    State(state): State<Arc<AppState>>,
    _auth: StaffAuth,
    Path(occurrence_id): Path<String>,
) -> Result<Json<RosterResponse>, ApiError> {
    let occurrence_id: OccurrenceId = parse_id(&occurrence_id)?;
    let occurrence = state.engine.get_occurrence(occurrence_id).await?;
    let bookings = state.engine.roster(occurrence_id).await?;
    Ok(Json(RosterResponse {
        occurrence,
        bookings,
    }))
}

/// Cancel any booking, without ownership or cutoff checks.
pub async fn staff_cancel_booking(
    State(state): State<Arc<AppState>>,
    auth: StaffAuth,
    Path(booking_id): Path<String>,
) -> Result<Json<CancellationReceipt>, ApiError> {
    let booking_id = parse_id(&booking_id)?;
    let receipt = state.engine.staff_cancel(booking_id).await?;
    tracing::info!(staff_id = %auth.staff_id, booking_id = %booking_id, "Staff cancellation");
    Ok(Json(receipt))
}

// ============================================================================
// Credits
// ============================================================================

/// Grant credits request.
#[derive(Debug, Deserialize)]
pub struct GrantCreditsRequest {
    /// Member receiving the credits.
    pub member_id: MemberId,
    /// Credits, positive.
    pub amount: i64,
    /// Purchase reference, e.g. an order id.
    pub reference: String,
}

/// Adjust credits request.
#[derive(Debug, Deserialize)]
pub struct AdjustCreditsRequest {
    /// Member.
    pub member_id: MemberId,
    /// Signed, non-zero.
    pub amount: i64,
    /// Why.
    pub note: String,
}

/// Ledger write response.
#[derive(Debug, Serialize)]
pub struct LedgerWriteResponse {
    /// The appended entry.
    pub entry: LedgerEntry,
    /// Balance after it.
    pub balance: i64,
}

/// Record a credit purchase.
pub async fn grant_credits(
    State(state): State<Arc<AppState>>,
    auth: StaffAuth,
    Json(request): Json<GrantCreditsRequest>,
) -> Result<Json<LedgerWriteResponse>, ApiError> {
    let (entry, balance) = state
        .engine
        .grant(request.member_id, request.amount, request.reference)
        .await?;
    tracing::info!(staff_id = %auth.staff_id, member_id = %request.member_id, "Credits granted");
    Ok(Json(LedgerWriteResponse { entry, balance }))
}

/// Record a signed correction.
pub async fn adjust_credits(
    State(state): State<Arc<AppState>>,
    auth: StaffAuth,
    Json(request): Json<AdjustCreditsRequest>,
) -> Result<Json<LedgerWriteResponse>, ApiError> {
    let (entry, balance) = state
        .engine
        .adjust(request.member_id, request.amount, request.note)
        .await?;
    tracing::info!(staff_id = %auth.staff_id, member_id = %request.member_id, "Credits adjusted");
    Ok(Json(LedgerWriteResponse { entry, balance }))
}

// ============================================================================
// Unavailable blocks
// ============================================================================

/// Create block request.
#[derive(Debug, Deserialize)]
pub struct CreateBlockRequest {
    /// Trainer, or none for the whole facility.
    #[serde(default)]
    pub trainer_id: Option<TrainerId>,
    /// Weekday, 0 = Sunday.
    pub weekday: u8,
    /// Gym-local start.
    pub start_time: NaiveTime,
    /// Gym-local end.
    pub end_time: NaiveTime,
    /// Shown to staff.
    #[serde(default)]
    pub description: String,
}

/// Create an unavailable block.
pub async fn create_block(
    State(state): State<Arc<AppState>>,
    _auth: StaffAuth,
    Json(request): Json<CreateBlockRequest>,
) -> Result<Json<UnavailableBlock>, ApiError> {
    let block = UnavailableBlock::new(
        request.trainer_id,
        request.weekday,
        request.start_time,
        request.end_time,
        request.description,
    )?;
    Ok(Json(state.engine.create_block(block).await?))
}

/// List blocks response.
#[derive(Debug, Serialize)]
pub struct ListBlocksResponse {
    /// Blocks.
    pub blocks: Vec<UnavailableBlock>,
}

/// List unavailable blocks.
pub async fn list_blocks(
    State(state): State<Arc<AppState>>,
    _auth: StaffAuth,
) -> Result<Json<ListBlocksResponse>, ApiError> {
    let blocks = state.engine.list_blocks().await?;
    Ok(Json(ListBlocksResponse { blocks }))
}

/// Delete block response.
#[derive(Debug, Serialize)]
pub struct DeleteBlockResponse {
    /// Deleted block.
    pub block_id: BlockId,
}

/// Delete an unavailable block.
pub async fn delete_block(
    State(state): State<Arc<AppState>>,
    _auth: StaffAuth,
    Path(block_id): Path<String>,
) -> Result<Json<DeleteBlockResponse>, ApiError> {
    let block_id = parse_id(&block_id)?;
    state.engine.delete_block(block_id).await?;
    Ok(Json(DeleteBlockResponse { block_id }))
}

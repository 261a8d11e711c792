//! The booking engine.
//!
//! [`Engine`] is what the HTTP handlers call. It owns the clock, reads the gym
//! timezone once per operation through [`Engine::gym_time`], runs store
//! transactions on the blocking pool, and sends notifications after commit.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use gym_core::availability::{self, Availability, AvailabilityQuery, GridShape, View};
use gym_core::generator::{self, GenerationReport};
use gym_core::{
    parse_timezone, BlockId, Booking, BookingError, BookingId, BookingReceipt, CancellationReceipt,
    Canceller, Clock, EntryReason, EntryRef, GymTime, LedgerEntry, MemberId, Occurrence,
    OccurrenceId, OccurrenceView, RecurringTemplate, TemplateId, UnavailableBlock,
};
use gym_store::{Result, Store, StoreError};

use crate::notify::{dispatch, Notification, Notifier, Recipient};

/// Engine settings taken from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Timezone used until one is stored.
    pub default_timezone: Tz,
    /// Generation window when a caller does not give one.
    pub weeks_ahead: u32,
    /// Availability grid shape.
    pub grid: GridShape,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_timezone: chrono_tz::UTC,
            weeks_ahead: 8,
            grid: GridShape::default(),
        }
    }
}

/// Scheduling, booking, and ledger operations.
pub struct Engine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    settings: EngineSettings,
}

impl Engine {
    /// Create an engine.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            settings,
        }
    }

    /// Engine settings.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run a store call on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| StoreError::Database(format!("store task failed: {e}")))?
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// The gym timezone: the stored one, or the configured default.
    pub async fn timezone(&self) -> Result<Tz> {
        match self.blocking(|s| s.timezone()).await? {
            Some(name) => Ok(parse_timezone(&name)?),
            None => Ok(self.settings.default_timezone),
        }
    }

    /// Current instant and gym timezone, read together.
    ///
    /// Every operation that needs "now" or "today" calls this exactly once.
    pub async fn gym_time(&self) -> Result<GymTime> {
        let tz = self.timezone().await?;
        Ok(GymTime::resolve(self.clock.as_ref(), tz))
    }

    /// Store the configured default timezone if none is stored yet.
    pub async fn init_timezone(&self) -> Result<Tz> {
        let default = self.settings.default_timezone;
        let stored = self
            .blocking(move |s| match s.timezone()? {
                Some(name) => Ok(Some(name)),
                None => s.set_timezone(default.name()).map(|()| None),
            })
            .await?;

        match stored {
            Some(name) => Ok(parse_timezone(&name)?),
            None => {
                tracing::info!(timezone = %default.name(), "Stored default gym timezone");
                Ok(default)
            }
        }
    }

    /// Change the gym timezone.
    ///
    /// Existing occurrences keep their local date and time; their instants move.
    pub async fn set_timezone(&self, name: &str) -> Result<Tz> {
        let tz = parse_timezone(name)?;
        self.blocking(move |s| s.set_timezone(tz.name())).await?;
        tracing::info!(timezone = %tz.name(), "Gym timezone changed");
        Ok(tz)
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Store a new template.
    pub async fn create_template(
        &self,
        mut template: RecurringTemplate,
    ) -> Result<RecurringTemplate> {
        template.created_at = self.clock.now();
        let stored = template.clone();
        self.blocking(move |s| s.put_template(&stored)).await?;
        tracing::info!(
            template_id = %template.id,
            name = %template.name,
            weekdays = ?template.weekdays.days(),
            "Template created"
        );
        Ok(template)
    }

    /// Get a template.
    pub async fn get_template(&self, id: TemplateId) -> Result<RecurringTemplate> {
        self.blocking(move |s| {
            s.get_template(&id)?
                .ok_or_else(|| BookingError::not_found("template", id).into())
        })
        .await
    }

    /// All templates.
    pub async fn list_templates(&self) -> Result<Vec<RecurringTemplate>> {
        self.blocking(|s| s.list_templates()).await
    }

    /// Delete a template and its unbooked occurrences.
    pub async fn delete_template(&self, id: TemplateId) -> Result<usize> {
        let removed = self.blocking(move |s| s.delete_template(&id)).await?;
        tracing::info!(template_id = %id, occurrences_removed = removed, "Template deleted");
        Ok(removed)
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// Expand one template over the window starting at gym-local today.
    ///
    /// Re-running over the same window inserts nothing.
    pub async fn generate(
        &self,
        template_id: TemplateId,
        weeks_ahead: Option<u32>,
    ) -> Result<GenerationReport> {
        let weeks = generator::clamp_weeks(weeks_ahead.unwrap_or(self.settings.weeks_ahead));
        let at = self.gym_time().await?;

        let report = self
            .blocking(move |s| {
                let template = s
                    .get_template(&template_id)?
                    .ok_or_else(|| BookingError::not_found("template", template_id))?;
                generate_template(s, &template, &at, weeks)
            })
            .await?;

        log_report(&report);
        Ok(report)
    }

    /// Expand every template. This is the periodic job's entry point.
    pub async fn generate_all(&self, weeks_ahead: Option<u32>) -> Result<Vec<GenerationReport>> {
        let weeks = generator::clamp_weeks(weeks_ahead.unwrap_or(self.settings.weeks_ahead));
        let at = self.gym_time().await?;

        let reports = self
            .blocking(move |s| {
                let mut reports = Vec::new();
                for template in s.list_templates()? {
                    match generate_template(s, &template, &at, weeks) {
                        Ok(report) => reports.push(report),
                        // Deleted since the listing.
                        Err(StoreError::Rejected(BookingError::NotFound { .. })) => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(reports)
            })
            .await?;

        for report in &reports {
            log_report(report);
        }
        Ok(reports)
    }

    // =========================================================================
    // Occurrences
    // =========================================================================

    /// Store a one-off occurrence.
    pub async fn create_one_off(&self, mut occurrence: Occurrence) -> Result<Occurrence> {
        occurrence.created_at = self.clock.now();
        let stored = occurrence.clone();
        self.blocking(move |s| s.insert_occurrence(&stored)).await?;
        tracing::info!(
            occurrence_id = %occurrence.id,
            date = %occurrence.date,
            start_time = %occurrence.start_time,
            "One-off occurrence created"
        );
        Ok(occurrence)
    }

    /// Occurrences dated in `[from, until)` with their booked counts.
    pub async fn list_occurrences(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<OccurrenceView>> {
        if until <= from {
            return Err(BookingError::InvalidRange(format!("{until} is not after {from}")).into());
        }
        self.blocking(move |s| s.list_occurrences(from, until)).await
    }

    /// An occurrence with its booked count.
    pub async fn get_occurrence(&self, id: OccurrenceId) -> Result<OccurrenceView> {
        self.blocking(move |s| {
            s.get_occurrence(&id)?
                .ok_or_else(|| BookingError::not_found("occurrence", id).into())
        })
        .await
    }

    /// Bookings held for an occurrence.
    pub async fn roster(&self, id: OccurrenceId) -> Result<Vec<Booking>> {
        self.blocking(move |s| {
            if s.get_occurrence(&id)?.is_none() {
                return Err(BookingError::not_found("occurrence", id).into());
            }
            s.bookings_for_occurrence(&id)
        })
        .await
    }

    // =========================================================================
    // Bookings
    // =========================================================================

    /// Book a seat for `member`, spending one credit.
    pub async fn book(&self, member: MemberId, occurrence: OccurrenceId) -> Result<BookingReceipt> {
        let at = self.gym_time().await?;
        tracing::debug!(member_id = %member, occurrence_id = %occurrence, "Booking requested");

        let receipt = self
            .blocking(move |s| s.book_with_credit(member, &occurrence, &at))
            .await
            .map_err(|e| log_rejection(e, "Booking rejected"))?;

        tracing::info!(
            booking_id = %receipt.booking.id,
            member_id = %member,
            occurrence_id = %occurrence,
            booked = receipt.booked_count,
            capacity = receipt.occurrence.capacity,
            balance_after = receipt.balance_after,
            "Booking confirmed"
        );

        dispatch(
            Arc::clone(&self.notifier),
            Notification::BookingConfirmed {
                booking_id: receipt.booking.id,
                member_id: member,
                occurrence_id: occurrence,
                starts_at: receipt.occurrence.starts_at(&at),
                recipients: vec![Recipient::Member(member), Recipient::Staff],
            },
        );

        Ok(receipt)
    }

    /// Cancel the member's own booking, subject to the cutoff.
    pub async fn cancel(&self, member: MemberId, booking: BookingId) -> Result<CancellationReceipt> {
        self.cancel_as(booking, Canceller::Member(member)).await
    }

    /// Cancel any booking, ignoring ownership and the cutoff.
    pub async fn staff_cancel(&self, booking: BookingId) -> Result<CancellationReceipt> {
        self.cancel_as(booking, Canceller::Staff).await
    }

    async fn cancel_as(
        &self,
        booking: BookingId,
        canceller: Canceller,
    ) -> Result<CancellationReceipt> {
        let at = self.gym_time().await?;
        let receipt = self
            .blocking(move |s| s.cancel_booking(&booking, canceller, &at))
            .await
            .map_err(|e| log_rejection(e, "Cancellation rejected"))?;

        let cancelled_by = match canceller {
            Canceller::Member(_) => "member",
            Canceller::Staff => "staff",
        };
        tracing::info!(
            booking_id = %booking,
            member_id = %receipt.booking.member_id,
            occurrence_id = %receipt.occurrence.id,
            cancelled_by,
            balance_after = receipt.balance_after,
            "Booking cancelled"
        );

        let mut recipients = vec![Recipient::Staff];
        if let Some(trainer) = receipt.occurrence.trainer_id {
            recipients.push(Recipient::Trainer(trainer));
        }
        dispatch(
            Arc::clone(&self.notifier),
            Notification::BookingCancelled {
                booking_id: booking,
                member_id: receipt.booking.member_id,
                occurrence_id: receipt.occurrence.id,
                starts_at: receipt.occurrence.starts_at(&at),
                cancelled_by,
                recipients,
            },
        );

        Ok(receipt)
    }

    /// Bookings held by a member.
    pub async fn member_bookings(&self, member: MemberId) -> Result<Vec<Booking>> {
        self.blocking(move |s| s.bookings_for_member(&member)).await
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// A member's balance.
    pub async fn balance(&self, member: MemberId) -> Result<i64> {
        self.blocking(move |s| s.balance(&member)).await
    }

    /// A member's ledger, newest first.
    pub async fn ledger(
        &self,
        member: MemberId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        self.blocking(move |s| s.ledger_entries(&member, limit, offset))
            .await
    }

    /// Record a credit purchase.
    pub async fn grant(
        &self,
        member: MemberId,
        amount: i64,
        reference: String,
    ) -> Result<(LedgerEntry, i64)> {
        if amount <= 0 {
            return Err(BookingError::InvalidInput("grant amount must be positive".into()).into());
        }
        let entry = LedgerEntry {
            created_at: self.clock.now(),
            ..LedgerEntry::grant(
                member,
                amount,
                EntryReason::Purchase,
                EntryRef::Purchase(reference),
            )
        };
        self.append(entry).await
    }

    /// Record a signed staff correction.
    pub async fn adjust(
        &self,
        member: MemberId,
        amount: i64,
        note: String,
    ) -> Result<(LedgerEntry, i64)> {
        if amount == 0 {
            return Err(BookingError::InvalidInput("adjustment must not be zero".into()).into());
        }
        let entry = LedgerEntry {
            created_at: self.clock.now(),
            ..LedgerEntry::signed(
                member,
                amount,
                EntryReason::AdminAdjustment,
                EntryRef::Adjustment(note),
            )
        };
        self.append(entry).await
    }

    async fn append(&self, entry: LedgerEntry) -> Result<(LedgerEntry, i64)> {
        let (stored, balance) = self.blocking(move |s| s.append_entry(&entry)).await?;
        tracing::info!(
            member_id = %stored.member_id,
            entry_id = %stored.id,
            amount = stored.amount,
            reason = stored.reason.as_str(),
            balance,
            "Ledger entry appended"
        );
        Ok((stored, balance))
    }

    // =========================================================================
    // Unavailable blocks
    // =========================================================================

    /// Store a block.
    pub async fn create_block(&self, mut block: UnavailableBlock) -> Result<UnavailableBlock> {
        block.created_at = self.clock.now();
        let stored = block.clone();
        self.blocking(move |s| s.put_block(&stored)).await?;
        tracing::info!(block_id = %block.id, weekday = block.weekday, "Block created");
        Ok(block)
    }

    /// All blocks.
    pub async fn list_blocks(&self) -> Result<Vec<UnavailableBlock>> {
        self.blocking(|s| s.list_blocks()).await
    }

    /// Delete a block.
    pub async fn delete_block(&self, id: BlockId) -> Result<()> {
        self.blocking(move |s| s.delete_block(&id)).await?;
        tracing::info!(block_id = %id, "Block deleted");
        Ok(())
    }

    // =========================================================================
    // Availability
    // =========================================================================

    /// Compose the availability grid.
    pub async fn availability(&self, query: AvailabilityQuery) -> Result<Availability> {
        let at = self.gym_time().await?;
        let (from, until) = query.range(at.today())?;

        // Include the day before so sessions running past midnight still shade.
        let lookback = from.pred_opt().unwrap_or(from);
        let (occurrences, blocks) = self
            .blocking(move |s| Ok((s.list_occurrences(lookback, until)?, s.list_blocks()?)))
            .await?;

        let grid = availability::compose(
            &self.settings.grid,
            (from, until),
            query.trainer,
            &occurrences,
            &blocks,
            &at,
        );
        Ok(match query.view {
            View::Admin => Availability::Admin(grid),
            View::Member => Availability::Member(grid.anonymize()),
        })
    }

    /// The current instant as the engine sees it.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

fn generate_template(
    store: &dyn Store,
    template: &RecurringTemplate,
    at: &GymTime,
    weeks: u32,
) -> Result<GenerationReport> {
    let today = at.today();
    let (window_start, window_end) = generator::window(today, weeks);
    let mut planned = generator::plan(template, today, weeks);
    for occurrence in &mut planned {
        occurrence.created_at = at.now();
    }
    let inserted = store.insert_generated(&template.id, &planned)?;
    Ok(GenerationReport {
        template_id: template.id,
        window_start,
        window_end,
        skipped: planned.len() - inserted.len(),
        inserted,
    })
}

fn log_report(report: &GenerationReport) {
    tracing::info!(
        template_id = %report.template_id,
        window_start = %report.window_start,
        window_end = %report.window_end,
        inserted = report.inserted.len(),
        skipped = report.skipped,
        "Generation complete"
    );
}

fn log_rejection(err: StoreError, message: &'static str) -> StoreError {
    match err.rejection() {
        Some(rejection) => tracing::warn!(reason = %rejection, "{message}"),
        None => tracing::error!(error = %err, "{message}"),
    }
    err
}

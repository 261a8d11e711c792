//! Dated, bookable occurrences.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::GymTime;
use crate::error::Result;
use crate::ids::{OccurrenceId, OfferingId, TemplateId, TrainerId};
use crate::template::{validate_shape, RecurringTemplate, SessionKind};

/// Where an occurrence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum OccurrenceOrigin {
    /// Expanded from a recurring template.
    Recurring {
        /// The template.
        template_id: TemplateId,
    },
    /// Created directly by staff for a one-off offering.
    OneOff {
        /// The offering in the external catalog.
        offering_id: OfferingId,
    },
}

/// A single dated, timed, capacity-bounded bookable instance.
///
/// Capacity is copied at creation so later template edits do not change
/// occurrences that already exist. The booked count is never stored here;
/// see [`OccurrenceView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Occurrence id.
    pub id: OccurrenceId,
    /// Template or one-off offering.
    pub origin: OccurrenceOrigin,
    /// Class or personal training.
    pub kind: SessionKind,
    /// Assigned trainer, if any.
    pub trainer_id: Option<TrainerId>,
    /// Gym-local date.
    pub date: NaiveDate,
    /// Gym-local start time.
    pub start_time: NaiveTime,
    /// Length in minutes.
    pub duration_minutes: u32,
    /// Seats.
    pub capacity: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Occurrence {
    /// Materialize `template` on `date`.
    #[must_use]
    pub fn from_template(template: &RecurringTemplate, date: NaiveDate) -> Self {
        Self {
            id: OccurrenceId::generate(),
            origin: OccurrenceOrigin::Recurring {
                template_id: template.id,
            },
            kind: template.kind,
            trainer_id: template.trainer_id,
            date,
            start_time: template.start_time,
            duration_minutes: template.duration_minutes,
            capacity: template.capacity,
            created_at: Utc::now(),
        }
    }

    /// Create a staff-defined one-off occurrence.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidInput` for a zero capacity or an
    /// out-of-range duration.
    #[allow(clippy::too_many_arguments)]
    pub fn one_off(
        offering_id: OfferingId,
        kind: SessionKind,
        trainer_id: Option<TrainerId>,
        date: NaiveDate,
        start_time: NaiveTime,
        duration_minutes: u32,
        capacity: u32,
    ) -> Result<Self> {
        validate_shape(duration_minutes, capacity)?;
        Ok(Self {
            id: OccurrenceId::generate(),
            origin: OccurrenceOrigin::OneOff { offering_id },
            kind,
            trainer_id,
            date,
            start_time,
            duration_minutes,
            capacity,
            created_at: Utc::now(),
        })
    }

    /// The template this occurrence was generated from, if any.
    #[must_use]
    pub const fn template_id(&self) -> Option<TemplateId> {
        match self.origin {
            OccurrenceOrigin::Recurring { template_id } => Some(template_id),
            OccurrenceOrigin::OneOff { .. } => None,
        }
    }

    /// Start instant, resolved in the gym timezone.
    #[must_use]
    pub fn starts_at(&self, at: &GymTime) -> DateTime<Utc> {
        at.starts_at(self.date, self.start_time)
    }

    /// Whether the occurrence has started as of `at`.
    #[must_use]
    pub fn has_started(&self, at: &GymTime) -> bool {
        self.starts_at(at) <= at.now()
    }

    /// Gym-local start and end wall times.
    #[must_use]
    pub fn local_span(&self) -> (chrono::NaiveDateTime, chrono::NaiveDateTime) {
        let start = self.date.and_time(self.start_time);
        (start, start + Duration::minutes(i64::from(self.duration_minutes)))
    }
}

/// An occurrence together with its derived booked count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceView {
    /// The occurrence row.
    #[serde(flatten)]
    pub occurrence: Occurrence,
    /// Bookings currently held, counted from booking rows.
    pub booked_count: u32,
}

impl OccurrenceView {
    /// Seats still free.
    #[must_use]
    pub const fn spots_left(&self) -> u32 {
        self.occurrence.capacity.saturating_sub(self.booked_count)
    }

    /// Whether no seat is left.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.booked_count >= self.occurrence.capacity
    }
}

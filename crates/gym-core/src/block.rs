//! Unavailable blocks.
//!
//! A block is advisory: it narrows what the availability grid shows as open,
//! but has no capacity and never touches bookings or the ledger.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::ids::{BlockId, TrainerId};

/// A weekly recurring window during which a trainer (or the whole facility)
/// is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableBlock {
    /// Block id.
    pub id: BlockId,
    /// Trainer, or `None` for the whole facility.
    pub trainer_id: Option<TrainerId>,
    /// Day of week, 0 = Sunday.
    pub weekday: u8,
    /// Local start time.
    pub start_time: NaiveTime,
    /// Local end time, after `start_time`.
    pub end_time: NaiveTime,
    /// Free text shown to staff.
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl UnavailableBlock {
    /// Create a validated block.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidInput` for a weekday above 6 or an
    /// end time that is not after the start time.
    pub fn new(
        trainer_id: Option<TrainerId>,
        weekday: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
        description: impl Into<String>,
    ) -> Result<Self> {
        if weekday > 6 {
            return Err(BookingError::InvalidInput(format!(
                "weekday {weekday} is out of range 0-6"
            )));
        }
        if end_time <= start_time {
            return Err(BookingError::InvalidInput(
                "block end must be after its start".into(),
            ));
        }
        Ok(Self {
            id: BlockId::generate(),
            trainer_id,
            weekday,
            start_time,
            end_time,
            description: description.into(),
            created_at: Utc::now(),
        })
    }

    /// Whether the block recurs on `weekday`.
    #[must_use]
    pub fn falls_on(&self, weekday: Weekday) -> bool {
        u32::from(self.weekday) == weekday.num_days_from_sunday()
    }

    /// Whether the block applies to a grid filtered to `trainer`.
    ///
    /// Facility-wide blocks apply everywhere; a trainer's own block applies
    /// only to that trainer's grid.
    #[must_use]
    pub fn applies_to(&self, trainer: Option<TrainerId>) -> bool {
        match (self.trainer_id, trainer) {
            (None, _) => true,
            (Some(own), Some(filter)) => own == filter,
            (Some(_), None) => false,
        }
    }

    /// Whether the block covers any part of `[start, end)` on `date`.
    #[must_use]
    pub fn overlaps(&self, date: NaiveDate, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        use chrono::Datelike;
        if !self.falls_on(date.weekday()) {
            return false;
        }
        let block_start = date.and_time(self.start_time);
        let block_end = date.and_time(self.end_time);
        block_start < end && start < block_end
    }
}

//! Bookings and the cancellation cutoff.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::GymTime;
use crate::error::{BookingError, Result};
use crate::ids::{BookingId, MemberId, OccurrenceId};
use crate::occurrence::Occurrence;

/// Credits one booking costs.
pub const CREDITS_PER_BOOKING: i64 = 1;

/// Minimum lead time for a member cancellation, in hours.
pub const CANCELLATION_CUTOFF_HOURS: i64 = 24;

/// A member's seat in an occurrence.
///
/// Cancelling deletes the row; the ledger keeps the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking id.
    pub id: BookingId,
    /// Who holds the seat.
    pub member_id: MemberId,
    /// Which occurrence.
    pub occurrence_id: OccurrenceId,
    /// When the booking committed.
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Create a new booking row.
    #[must_use]
    pub fn new(member_id: MemberId, occurrence_id: OccurrenceId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: BookingId::generate(),
            member_id,
            occurrence_id,
            created_at,
        }
    }
}

/// Who is cancelling a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canceller {
    /// The member themselves; ownership and the cutoff apply.
    Member(MemberId),
    /// Staff; neither check applies.
    Staff,
}

/// Check that a member may still cancel a seat in `occurrence`.
///
/// Allowed when the occurrence starts at least
/// [`CANCELLATION_CUTOFF_HOURS`] after `at.now()`.
///
/// # Errors
///
/// Returns `BookingError::CancellationTooLate` inside the cutoff window.
pub fn check_cancellation_cutoff(occurrence: &Occurrence, at: &GymTime) -> Result<()> {
    let starts_at = occurrence.starts_at(at);
    if starts_at - at.now() < Duration::hours(CANCELLATION_CUTOFF_HOURS) {
        return Err(BookingError::CancellationTooLate {
            starts_at,
            cutoff_hours: CANCELLATION_CUTOFF_HOURS,
        });
    }
    Ok(())
}

/// Outcome of a committed booking.
#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    /// The new booking.
    pub booking: Booking,
    /// The booked occurrence.
    pub occurrence: Occurrence,
    /// Booked count after the insert.
    pub booked_count: u32,
    /// Member balance after the debit.
    pub balance_after: i64,
}

/// Outcome of a committed cancellation.
#[derive(Debug, Clone, Serialize)]
pub struct CancellationReceipt {
    /// The deleted booking.
    pub booking: Booking,
    /// Its occurrence.
    pub occurrence: Occurrence,
    /// Booked count after the delete.
    pub booked_count: u32,
    /// Member balance after the refund.
    pub balance_after: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{RecurringTemplate, SessionKind, WeekdaySet};
    use chrono::{NaiveDate, NaiveTime};

    fn occurrence_at_18_on_the_20th() -> Occurrence {
        let tpl = RecurringTemplate::new(
            "Boxing",
            None,
            SessionKind::Class,
            WeekdaySet::from_days(&[2]).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            60,
            12,
        )
        .unwrap();
        Occurrence::from_template(&tpl, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap())
    }

    fn at(utc: &str) -> GymTime {
        GymTime::new(chrono_tz::America::Chicago, utc.parse().unwrap())
    }

    #[test]
    fn exactly_24h_before_start_is_allowed() {
        // 18:00 CDT on the 20th is 23:00 UTC.
        let occ = occurrence_at_18_on_the_20th();
        assert!(check_cancellation_cutoff(&occ, &at("2026-10-19T23:00:00Z")).is_ok());
    }

    #[test]
    fn one_minute_inside_cutoff_is_rejected() {
        let occ = occurrence_at_18_on_the_20th();
        let err = check_cancellation_cutoff(&occ, &at("2026-10-19T23:01:00Z")).unwrap_err();
        assert!(matches!(
            err,
            BookingError::CancellationTooLate { cutoff_hours: 24, .. }
        ));
    }

    #[test]
    fn cutoff_uses_gym_timezone() {
        // Same wall clock, UTC zone: start is 18:00Z, so 19:00Z the day before is 23h out.
        let occ = occurrence_at_18_on_the_20th();
        let utc_gym = GymTime::new(chrono_tz::UTC, "2026-10-19T19:00:00Z".parse().unwrap());
        assert!(check_cancellation_cutoff(&occ, &utc_gym).is_err());
        assert!(check_cancellation_cutoff(&occ, &at("2026-10-19T19:00:00Z")).is_ok());
    }
}

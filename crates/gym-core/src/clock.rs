//! Gym-local time resolution.
//!
//! The generator window, the availability grid, and the cancellation cutoff
//! all read "now" and "today" through [`GymTime`], built once per operation
//! from a [`Clock`] and the gym's configured IANA timezone. Nothing else in
//! the engine converts between instants and wall-clock time.

use std::sync::RwLock;

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::{BookingError, Result};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a settable instant, for tests.
#[derive(Debug)]
pub struct FixedClock {
    time: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock fixed at `time`.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: RwLock::new(time),
        }
    }

    /// Move the clock to `time`.
    pub fn set(&self, time: DateTime<Utc>) {
        if let Ok(mut guard) = self.time.write() {
            *guard = time;
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.time.write() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time.read().map_or_else(|poisoned| *poisoned.into_inner(), |t| *t)
    }
}

/// Parse an IANA timezone name.
///
/// # Errors
///
/// Returns `BookingError::InvalidTimezone` if the name is not a known zone.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| BookingError::InvalidTimezone(name.to_string()))
}

/// A single instant resolved against the gym's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GymTime {
    tz: Tz,
    now: DateTime<Utc>,
}

impl GymTime {
    /// Pair an instant with a timezone.
    #[must_use]
    pub const fn new(tz: Tz, now: DateTime<Utc>) -> Self {
        Self { tz, now }
    }

    /// Read the clock once and pair it with `tz`.
    #[must_use]
    pub fn resolve(clock: &dyn Clock, tz: Tz) -> Self {
        Self::new(tz, clock.now())
    }

    /// The gym timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// The current instant.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Current wall-clock time at the gym.
    #[must_use]
    pub fn local_now(&self) -> NaiveDateTime {
        self.now.with_timezone(&self.tz).naive_local()
    }

    /// Today's date at the gym.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.local_now().date()
    }

    /// The instant a gym-local `date` + `time` denotes.
    ///
    /// An ambiguous wall time (DST fall-back) resolves to the earlier instant.
    /// A wall time inside a DST gap resolves to the first valid instant after
    /// the gap.
    #[must_use]
    pub fn starts_at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        local_to_utc(self.tz, date.and_time(time))
    }
}

fn local_to_utc(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // Gaps are at most a few hours; walk forward a minute at a time.
            let mut candidate = naive;
            for _ in 0..(24 * 60) {
                candidate += Duration::minutes(1);
                if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
                    return dt.with_timezone(&Utc);
                }
            }
            Utc.from_utc_datetime(&naive)
        }
    }
}

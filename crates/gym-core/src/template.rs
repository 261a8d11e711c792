//! Recurring weekly templates.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::ids::{TemplateId, TrainerId};

/// Longest session a template may describe.
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// What kind of session an occurrence is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// A group class.
    Class,
    /// A personal-training slot with a specific trainer.
    PersonalTraining,
}

/// A set of weekdays, numbered 0 (Sunday) through 6 (Saturday).
///
/// Serialized as a sorted list of day numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Build a set from day numbers (0 = Sunday).
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidInput` if any number is above 6.
    pub fn from_days(days: &[u8]) -> Result<Self> {
        let mut bits = 0u8;
        for &day in days {
            if day > 6 {
                return Err(BookingError::InvalidInput(format!(
                    "weekday {day} is out of range 0-6"
                )));
            }
            bits |= 1 << day;
        }
        Ok(Self(bits))
    }

    /// Whether `weekday` is in the set.
    #[must_use]
    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday.num_days_from_sunday()) != 0
    }

    /// Whether `date` falls on a day in the set.
    #[must_use]
    pub fn matches(&self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }

    /// Whether the set has no days.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Day numbers in ascending order.
    #[must_use]
    pub fn days(&self) -> Vec<u8> {
        (0..7).filter(|d| self.0 & (1 << d) != 0).collect()
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = BookingError;

    fn try_from(value: Vec<u8>) -> Result<Self> {
        Self::from_days(&value)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.days()
    }
}

/// A weekly recurring definition that occurrences are generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    /// Template id.
    pub id: TemplateId,

    /// Display name ("Spin 18:00").
    pub name: String,

    /// Owning trainer. `None` means facility-wide.
    pub trainer_id: Option<TrainerId>,

    /// Class or personal training.
    pub kind: SessionKind,

    /// Days the template runs on.
    pub weekdays: WeekdaySet,

    /// Local start time.
    pub start_time: NaiveTime,

    /// Session length in minutes.
    pub duration_minutes: u32,

    /// Seats per occurrence.
    pub capacity: u32,

    /// When staff created the template.
    pub created_at: DateTime<Utc>,
}

impl RecurringTemplate {
    /// Create a validated template.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidInput` when capacity is zero or the
    /// duration is zero or longer than a day.
    pub fn new(
        name: impl Into<String>,
        trainer_id: Option<TrainerId>,
        kind: SessionKind,
        weekdays: WeekdaySet,
        start_time: NaiveTime,
        duration_minutes: u32,
        capacity: u32,
    ) -> Result<Self> {
        validate_shape(duration_minutes, capacity)?;
        Ok(Self {
            id: TemplateId::generate(),
            name: name.into(),
            trainer_id,
            kind,
            weekdays,
            start_time,
            duration_minutes,
            capacity,
            created_at: Utc::now(),
        })
    }
}

/// Shared validation for anything that becomes a bookable occurrence.
pub(crate) fn validate_shape(duration_minutes: u32, capacity: u32) -> Result<()> {
    if capacity == 0 {
        return Err(BookingError::InvalidInput("capacity must be at least 1".into()));
    }
    if duration_minutes == 0 || duration_minutes > MAX_DURATION_MINUTES {
        return Err(BookingError::InvalidInput(format!(
            "duration must be between 1 and {MAX_DURATION_MINUTES} minutes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_numbers_start_on_sunday() {
        let set = WeekdaySet::from_days(&[0, 2, 4]).unwrap();
        assert!(set.contains(Weekday::Sun));
        assert!(set.contains(Weekday::Tue));
        assert!(set.contains(Weekday::Thu));
        assert!(!set.contains(Weekday::Mon));
        assert_eq!(set.days(), vec![0, 2, 4]);
    }

    #[test]
    fn weekday_out_of_range_rejected() {
        assert!(matches!(
            WeekdaySet::from_days(&[7]),
            Err(BookingError::InvalidInput(_))
        ));
    }

    #[test]
    fn weekday_set_serializes_as_list() {
        let set = WeekdaySet::from_days(&[4, 2]).unwrap();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[2,4]");
        let back: WeekdaySet = serde_json::from_str("[4,2,2]").unwrap();
        assert_eq!(back, set);
        assert!(serde_json::from_str::<WeekdaySet>("[9]").is_err());
    }

    #[test]
    fn template_rejects_zero_capacity() {
        let result = RecurringTemplate::new(
            "Spin",
            None,
            SessionKind::Class,
            WeekdaySet::default(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            45,
            0,
        );
        assert!(matches!(result, Err(BookingError::InvalidInput(_))));
    }
}

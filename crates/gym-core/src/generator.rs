//! Expansion of recurring templates into dated occurrences.
//!
//! This module only plans candidates. Persisting them, and skipping the
//! (template, date, time) slots that already exist, is the store's job; that
//! is what makes re-running a generation a no-op.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::ids::{OccurrenceId, TemplateId};
use crate::occurrence::Occurrence;
use crate::template::RecurringTemplate;

/// Upper bound on how far ahead a single generation may reach.
pub const MAX_WEEKS_AHEAD: u32 = 52;

/// Clamp a requested window to [`MAX_WEEKS_AHEAD`].
#[must_use]
pub const fn clamp_weeks(weeks_ahead: u32) -> u32 {
    if weeks_ahead > MAX_WEEKS_AHEAD {
        MAX_WEEKS_AHEAD
    } else {
        weeks_ahead
    }
}

/// The half-open window `[today, today + weeks * 7)`.
#[must_use]
pub fn window(today: NaiveDate, weeks_ahead: u32) -> (NaiveDate, NaiveDate) {
    let days = u64::from(clamp_weeks(weeks_ahead)) * 7;
    let end = today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
    (today, end)
}

/// Candidate occurrences for `template` over the window starting `today`.
///
/// Dates are ascending. An empty weekday set yields nothing.
#[must_use]
pub fn plan(template: &RecurringTemplate, today: NaiveDate, weeks_ahead: u32) -> Vec<Occurrence> {
    if template.weekdays.is_empty() {
        return Vec::new();
    }
    let (start, end) = window(today, weeks_ahead);
    start
        .iter_days()
        .take_while(|date| *date < end)
        .filter(|date| template.weekdays.matches(*date))
        .map(|date| Occurrence::from_template(template, date))
        .collect()
}

/// What one generation run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// The template expanded.
    pub template_id: TemplateId,
    /// First date of the window.
    pub window_start: NaiveDate,
    /// First date after the window.
    pub window_end: NaiveDate,
    /// Occurrences written by this run.
    pub inserted: Vec<OccurrenceId>,
    /// Candidates whose slot already existed.
    pub skipped: usize,
}

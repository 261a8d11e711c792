//! Error types for the booking engine.
//!
//! Every variant is a terminal, caller-visible outcome. None of them is retried
//! by the engine itself; the caller decides whether to buy credits, pick
//! another slot, or give up.

use chrono::{DateTime, Utc};

use crate::ids::IdError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Errors raised while validating a scheduling or booking operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of row ("occurrence", "booking", "template", ...).
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The occurrence has no free seat left.
    #[error("occurrence {occurrence_id} is full ({capacity} seats)")]
    CapacityExceeded {
        /// The full occurrence.
        occurrence_id: String,
        /// Its capacity.
        capacity: u32,
    },

    /// The member's ledger balance cannot cover the booking.
    #[error("insufficient credit: balance={balance}, required={required}")]
    InsufficientCredit {
        /// Current balance in credits.
        balance: i64,
        /// Credits the operation needs.
        required: i64,
    },

    /// The member already holds a booking for this occurrence.
    #[error("member {member_id} already booked occurrence {occurrence_id}")]
    DuplicateBooking {
        /// The member.
        member_id: String,
        /// The occurrence.
        occurrence_id: String,
    },

    /// The occurrence starts too soon for a member cancellation.
    #[error("too late to cancel: starts at {starts_at}, cutoff is {cutoff_hours}h before start")]
    CancellationTooLate {
        /// When the occurrence starts.
        starts_at: DateTime<Utc>,
        /// Minimum lead time in hours.
        cutoff_hours: i64,
    },

    /// The booking belongs to another member.
    #[error("booking does not belong to the requesting member")]
    Unauthorized,

    /// The occurrence has already started.
    #[error("occurrence {occurrence_id} already started at {starts_at}")]
    OccurrenceStarted {
        /// The occurrence.
        occurrence_id: String,
        /// When it started.
        starts_at: DateTime<Utc>,
    },

    /// A template still has booked occurrences and cannot be deleted.
    #[error("template {template_id} has {bookings} active bookings")]
    TemplateInUse {
        /// The template.
        template_id: String,
        /// Bookings still referencing its occurrences.
        bookings: usize,
    },

    /// The timezone name is not a known IANA zone.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// A date range was empty, reversed, or too long.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl BookingError {
    /// Shorthand for [`BookingError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

//! Core types and rules for gym scheduling and booking.
//!
//! This crate holds everything that does not touch storage or the network:
//!
//! - **Identifiers**: `MemberId`, `TrainerId`, `TemplateId`, `OccurrenceId`, `BookingId`, `BlockId`, `LedgerEntryId`
//! - **Schedule**: `RecurringTemplate`, `Occurrence`, `UnavailableBlock`
//! - **Bookings**: `Booking`, the cancellation cutoff, receipts
//! - **Credits**: `LedgerEntry`, `EntryReason`, `balance`
//! - **Time**: `Clock`, `GymTime`
//! - **Pure functions**: occurrence planning (`generator`) and grid composition (`availability`)
//!
//! # Gym time
//!
//! Every rule that depends on "now" takes a [`GymTime`], built once per
//! operation from a [`Clock`] and the gym's configured timezone. Dates and
//! times on templates, occurrences, and blocks are gym-local wall times.
//!
//! # Credits
//!
//! - One booking costs [`CREDITS_PER_BOOKING`] credit
//! - A member cancellation at least [`CANCELLATION_CUTOFF_HOURS`] before start refunds it
//! - Balances are never stored; they are the sum of ledger entries

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod availability;
pub mod block;
pub mod booking;
pub mod clock;
pub mod error;
pub mod generator;
pub mod ids;
pub mod ledger;
pub mod occurrence;
pub mod template;

pub use availability::{
    AdminStatus, Availability, AvailabilityGrid, AvailabilityQuery, GridShape, MemberStatus,
    Slot, View,
};
pub use block::UnavailableBlock;
pub use booking::{
    check_cancellation_cutoff, Booking, BookingReceipt, CancellationReceipt, Canceller,
    CANCELLATION_CUTOFF_HOURS, CREDITS_PER_BOOKING,
};
pub use clock::{parse_timezone, Clock, FixedClock, GymTime, SystemClock};
pub use error::{BookingError, Result};
pub use generator::{GenerationReport, MAX_WEEKS_AHEAD};
pub use ids::{
    BlockId, BookingId, IdError, LedgerEntryId, MemberId, OccurrenceId, OfferingId, TemplateId,
    TrainerId,
};
pub use ledger::{balance, EntryReason, EntryRef, LedgerEntry};
pub use occurrence::{Occurrence, OccurrenceOrigin, OccurrenceView};
pub use template::{RecurringTemplate, SessionKind, WeekdaySet, MAX_DURATION_MINUTES};

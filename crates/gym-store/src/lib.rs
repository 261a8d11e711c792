//! `RocksDB` storage layer for gym scheduling and booking.
//!
//! This crate owns every write: templates, occurrences, bookings, ledger
//! entries, and blocks. Operations that must preserve an invariant
//! (capacity, one booking per member per occurrence, non-negative balance
//! after a debit, slot uniqueness) run inside a single pessimistic
//! transaction that takes row locks before reading what it validates.
//!
//! # Architecture
//!
//! The storage uses the column families listed in [`schema::cf`]. Derived
//! values are never stored: an occurrence's booked count is the number of
//! keys under its prefix in `bookings_by_occurrence`, and a member's balance
//! is the sum of their entries in `ledger`.
//!
//! Lock order is always booking, then occurrence, then member ledger, so
//! concurrent transactions cannot wait on each other in a cycle.
//!
//! # Example
//!
//! ```no_run
//! use gym_core::{EntryReason, EntryRef, MemberId};
//! use gym_store::{RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/gym-booking-db").unwrap();
//!
//! let member = MemberId::generate();
//! store
//!     .grant(member, 10, EntryReason::Purchase, EntryRef::Purchase("order-1".into()))
//!     .unwrap();
//! assert_eq!(store.balance(&member).unwrap(), 10);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::{RocksStore, DEFAULT_LOCK_TIMEOUT};

use chrono::NaiveDate;
use gym_core::{
    BlockId, Booking, BookingId, BookingReceipt, CancellationReceipt, Canceller, EntryReason,
    EntryRef, GymTime, LedgerEntry, MemberId, Occurrence, OccurrenceId, OccurrenceView,
    RecurringTemplate, TemplateId, UnavailableBlock,
};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer so the service can be tested
/// against a temporary database and run against a persistent one.
pub trait Store: Send + Sync {
    // =========================================================================
    // Settings
    // =========================================================================

    /// The stored gym timezone name, if one has been set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn timezone(&self) -> Result<Option<String>>;

    /// Store the gym timezone name. The caller validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn set_timezone(&self, name: &str) -> Result<()>;

    // =========================================================================
    // Templates
    // =========================================================================

    /// Insert or replace a template.
    ///
    /// Existing occurrences keep the capacity they were generated with.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_template(&self, template: &RecurringTemplate) -> Result<()>;

    /// Get a template by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_template(&self, id: &TemplateId) -> Result<Option<RecurringTemplate>>;

    /// List all templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_templates(&self) -> Result<Vec<RecurringTemplate>>;

    /// Delete a template and every occurrence generated from it.
    ///
    /// Returns the number of occurrences removed.
    ///
    /// # Errors
    ///
    /// - `BookingError::NotFound` if the template does not exist.
    /// - `BookingError::TemplateInUse` if any of its occurrences holds a booking.
    fn delete_template(&self, id: &TemplateId) -> Result<usize>;

    // =========================================================================
    // Occurrences
    // =========================================================================

    /// Insert generated occurrences of `template`, skipping any whose
    /// (template, date, time) slot already exists.
    ///
    /// Returns the ids actually inserted.
    ///
    /// # Errors
    ///
    /// - `BookingError::NotFound` if the template was deleted meanwhile.
    /// - `BookingError::InvalidInput` if an occurrence is not from `template`.
    fn insert_generated(
        &self,
        template: &TemplateId,
        occurrences: &[Occurrence],
    ) -> Result<Vec<OccurrenceId>>;

    /// Insert a one-off occurrence. One-offs have no slot uniqueness.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn insert_occurrence(&self, occurrence: &Occurrence) -> Result<()>;

    /// Get an occurrence with its current booked count.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_occurrence(&self, id: &OccurrenceId) -> Result<Option<OccurrenceView>>;

    /// List occurrences dated in `[from, until)`, ordered by date then start time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_occurrences(&self, from: NaiveDate, until: NaiveDate) -> Result<Vec<OccurrenceView>>;

    // =========================================================================
    // Bookings
    // =========================================================================

    /// Book one seat for `member` and debit one credit, atomically.
    ///
    /// Preconditions are checked in this order, each under the relevant
    /// row lock: occurrence exists, has not started, has a free seat,
    /// member holds no booking for it, balance covers the cost.
    ///
    /// # Errors
    ///
    /// - `BookingError::NotFound`, `OccurrenceStarted`, `CapacityExceeded`,
    ///   `DuplicateBooking`, `InsufficientCredit` as above.
    /// - `StoreError::Busy` if a lock could not be taken in time.
    fn book_with_credit(
        &self,
        member: MemberId,
        occurrence: &OccurrenceId,
        at: &GymTime,
    ) -> Result<BookingReceipt>;

    /// Cancel a booking and refund its credit, atomically.
    ///
    /// For `Canceller::Member` the booking must belong to that member and
    /// the occurrence must start at least the cutoff after `at.now()`.
    /// Staff cancellations skip both checks.
    ///
    /// # Errors
    ///
    /// - `BookingError::NotFound` if the booking or occurrence is gone.
    /// - `BookingError::Unauthorized` on an ownership mismatch.
    /// - `BookingError::CancellationTooLate` inside the cutoff.
    /// - `StoreError::Busy` if a lock could not be taken in time.
    fn cancel_booking(
        &self,
        booking: &BookingId,
        canceller: Canceller,
        at: &GymTime,
    ) -> Result<CancellationReceipt>;

    /// Get a booking by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_booking(&self, id: &BookingId) -> Result<Option<Booking>>;

    /// Bookings held for an occurrence.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn bookings_for_occurrence(&self, occurrence: &OccurrenceId) -> Result<Vec<Booking>>;

    /// Bookings held by a member.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn bookings_for_member(&self, member: &MemberId) -> Result<Vec<Booking>>;

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Append one entry under the member's ledger lock.
    ///
    /// The stored entry may get a new id so that ids stay strictly
    /// increasing per member. Returns the stored entry and the balance
    /// after it. No balance check is made here.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn append_entry(&self, entry: &LedgerEntry) -> Result<(LedgerEntry, i64)>;

    /// Sum of the member's entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn balance(&self, member: &MemberId) -> Result<i64>;

    /// The member's entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn ledger_entries(
        &self,
        member: &MemberId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>>;

    /// Append a positive entry. Returns the balance after it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn grant(
        &self,
        member: MemberId,
        amount: i64,
        reason: EntryReason,
        reference: EntryRef,
    ) -> Result<i64> {
        let entry = LedgerEntry::grant(member, amount, reason, reference);
        self.append_entry(&entry).map(|(_, balance)| balance)
    }

    /// Append a negative entry. Returns the balance after it.
    ///
    /// The caller is responsible for any balance check.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn debit(
        &self,
        member: MemberId,
        amount: i64,
        reason: EntryReason,
        reference: EntryRef,
    ) -> Result<i64> {
        let entry = LedgerEntry::debit(member, amount, reason, reference);
        self.append_entry(&entry).map(|(_, balance)| balance)
    }

    // =========================================================================
    // Unavailable blocks
    // =========================================================================

    /// Insert or replace a block.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_block(&self, block: &UnavailableBlock) -> Result<()>;

    /// List all blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_blocks(&self) -> Result<Vec<UnavailableBlock>>;

    /// Delete a block.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::NotFound` if the block does not exist.
    fn delete_block(&self, id: &BlockId) -> Result<()>;
}

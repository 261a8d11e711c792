//! Column families.
//!
//! Secondary indexes carry the id of the primary row as their value (or an
//! empty value when the key already embeds it) and are written in the same
//! transaction as the row they index.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Gym-wide settings, keyed by setting name.
    pub const SETTINGS: &str = "settings";

    /// Recurring templates, keyed by `template_id`.
    pub const TEMPLATES: &str = "templates";

    /// Occurrences, keyed by `occurrence_id`.
    pub const OCCURRENCES: &str = "occurrences";

    /// Uniqueness index: `template_id || date || time` to `occurrence_id`.
    /// At most one key per slot, so generation can skip present keys.
    pub const OCCURRENCE_SLOTS: &str = "occurrence_slots";

    /// Index: `date || occurrence_id`, empty value. Drives range listing.
    pub const OCCURRENCES_BY_DATE: &str = "occurrences_by_date";

    /// Bookings, keyed by `booking_id`.
    pub const BOOKINGS: &str = "bookings";

    /// Index: `occurrence_id || member_id` to `booking_id`.
    /// The prefix count is the booked count; the full key guards double-booking.
    pub const BOOKINGS_BY_OCCURRENCE: &str = "bookings_by_occurrence";

    /// Index: `member_id || booking_id`, empty value.
    pub const BOOKINGS_BY_MEMBER: &str = "bookings_by_member";

    /// Ledger entries, keyed by `member_id || entry_id` (ULID, time-ordered).
    pub const LEDGER: &str = "ledger";

    /// One key per member holding the last entry id. Locked by every
    /// transaction that appends to that member's ledger.
    pub const LEDGER_LOCKS: &str = "ledger_locks";

    /// Unavailable blocks, keyed by `block_id`.
    pub const BLOCKS: &str = "blocks";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::SETTINGS,
        cf::TEMPLATES,
        cf::OCCURRENCES,
        cf::OCCURRENCE_SLOTS,
        cf::OCCURRENCES_BY_DATE,
        cf::BOOKINGS,
        cf::BOOKINGS_BY_OCCURRENCE,
        cf::BOOKINGS_BY_MEMBER,
        cf::LEDGER,
        cf::LEDGER_LOCKS,
        cf::BLOCKS,
    ]
}

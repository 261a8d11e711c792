//! Key encoding for the column families in [`crate::schema`].
//!
//! All composite keys are fixed-width and big-endian so that byte order is
//! the order we iterate in: dates sort chronologically, ULIDs by time.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use gym_core::{BlockId, BookingId, LedgerEntryId, MemberId, OccurrenceId, TemplateId};

use crate::error::{Result, StoreError};

/// Settings key for the gym timezone.
pub const TIMEZONE_SETTING: &[u8] = b"timezone";

/// Encode a date so that byte order matches date order.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn date_bytes(date: NaiveDate) -> [u8; 4] {
    // Flip the sign bit so negative day numbers sort first.
    ((date.num_days_from_ce() as u32) ^ 0x8000_0000).to_be_bytes()
}

/// Encode a time of day as seconds from midnight.
#[must_use]
pub fn time_bytes(time: NaiveTime) -> [u8; 4] {
    time.num_seconds_from_midnight().to_be_bytes()
}

/// Create a template key.
#[must_use]
pub fn template_key(id: &TemplateId) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// Create an occurrence key.
#[must_use]
pub fn occurrence_key(id: &OccurrenceId) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// Create a booking key.
#[must_use]
pub fn booking_key(id: &BookingId) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// Create a block key.
#[must_use]
pub fn block_key(id: &BlockId) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// Create a slot uniqueness key.
///
/// Format: `template_id (16) || date (4) || time (4)`
#[must_use]
pub fn slot_key(template: &TemplateId, date: NaiveDate, time: NaiveTime) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(template.as_bytes());
    key.extend_from_slice(&date_bytes(date));
    key.extend_from_slice(&time_bytes(time));
    key
}

/// Prefix for all slots of a template.
#[must_use]
pub fn template_slots_prefix(template: &TemplateId) -> Vec<u8> {
    template.as_bytes().to_vec()
}

/// Create a date index key.
///
/// Format: `date (4) || occurrence_id (16)`
#[must_use]
pub fn date_index_key(date: NaiveDate, occurrence: &OccurrenceId) -> Vec<u8> {
    let mut key = Vec::with_capacity(20);
    key.extend_from_slice(&date_bytes(date));
    key.extend_from_slice(occurrence.as_bytes());
    key
}

/// Create an occurrence-member booking index key.
///
/// Format: `occurrence_id (16) || member_id (16)`
#[must_use]
pub fn occurrence_member_key(occurrence: &OccurrenceId, member: &MemberId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(occurrence.as_bytes());
    key.extend_from_slice(member.as_bytes());
    key
}

/// Prefix for all bookings of an occurrence.
#[must_use]
pub fn occurrence_bookings_prefix(occurrence: &OccurrenceId) -> Vec<u8> {
    occurrence.as_bytes().to_vec()
}

/// Create a member-booking index key.
///
/// Format: `member_id (16) || booking_id (16)`
#[must_use]
pub fn member_booking_key(member: &MemberId, booking: &BookingId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(member.as_bytes());
    key.extend_from_slice(booking.as_bytes());
    key
}

/// Create a ledger entry key.
///
/// Format: `member_id (16) || entry_id (16)`
///
/// Entry ids are ULIDs, so a member's entries sort by time.
#[must_use]
pub fn ledger_key(member: &MemberId, entry: &LedgerEntryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(member.as_bytes());
    key.extend_from_slice(&entry.to_bytes());
    key
}

/// Prefix for a member's bookings, ledger entries, and ledger lock.
#[must_use]
pub fn member_prefix(member: &MemberId) -> Vec<u8> {
    member.as_bytes().to_vec()
}

/// Upper bound of a member's ledger keys, for reverse scans.
#[must_use]
pub fn member_ledger_end(member: &MemberId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(member.as_bytes());
    key.extend_from_slice(&[0xFF; 16]);
    key
}

/// Read a 16-byte id out of `key` at `offset`.
///
/// # Errors
///
/// Returns `StoreError::Database` if the key is too short.
pub fn id_bytes_at(key: &[u8], offset: usize) -> Result<[u8; 16]> {
    key.get(offset..offset + 16)
        .and_then(|slice| <[u8; 16]>::try_from(slice).ok())
        .ok_or_else(|| StoreError::Database(format!("malformed index key of {} bytes", key.len())))
}

/// Extract the occurrence id from a date index key.
///
/// # Errors
///
/// Returns `StoreError::Database` if the key is malformed.
pub fn occurrence_from_date_key(key: &[u8]) -> Result<OccurrenceId> {
    id_bytes_at(key, 4).map(OccurrenceId::from_bytes)
}

/// Extract the booking id from a member-booking key.
///
/// # Errors
///
/// Returns `StoreError::Database` if the key is malformed.
pub fn booking_from_member_key(key: &[u8]) -> Result<BookingId> {
    id_bytes_at(key, 16).map(BookingId::from_bytes)
}

/// Decode a ledger entry id from its stored bytes.
///
/// # Errors
///
/// Returns `StoreError::Database` if the bytes are not a ULID.
pub fn ledger_entry_id(bytes: &[u8]) -> Result<LedgerEntryId> {
    let raw = id_bytes_at(bytes, 0)?;
    LedgerEntryId::from_bytes(raw).map_err(|e| StoreError::Database(e.to_string()))
}

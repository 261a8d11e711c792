//! Credit ledger entries.
//!
//! The ledger is append-only. A member's balance is the sum of their entries
//! and is never stored anywhere else. Corrections are new offsetting entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BookingId, LedgerEntryId, MemberId};

/// Why an entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    /// Credits bought through the external checkout.
    Purchase,
    /// Seat booked.
    Booking,
    /// Member cancelled before the cutoff.
    MemberCancel,
    /// Staff cancelled the booking.
    StaffCancel,
    /// Manual correction by staff.
    AdminAdjustment,
}

impl EntryReason {
    /// Reason code as stored and reported.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Booking => "booking",
            Self::MemberCancel => "member_cancel",
            Self::StaffCancel => "staff_cancel",
            Self::AdminAdjustment => "admin_adjustment",
        }
    }
}

/// What caused an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum EntryRef {
    /// An external purchase or order reference.
    Purchase(String),
    /// A booking (debit on book, credit on cancel).
    Booking(BookingId),
    /// A staff adjustment, with free-text ticket or note.
    Adjustment(String),
}

/// One signed credit movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry id (time-ordered).
    pub id: LedgerEntryId,
    /// Whose balance moved.
    pub member_id: MemberId,
    /// Positive grants, negative debits.
    pub amount: i64,
    /// Reason code.
    pub reason: EntryReason,
    /// What caused it.
    pub reference: EntryRef,
    /// When it was appended.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// A grant of `amount` credits. The sign of `amount` is forced positive.
    #[must_use]
    pub fn grant(member_id: MemberId, amount: i64, reason: EntryReason, reference: EntryRef) -> Self {
        Self::signed(member_id, amount.abs(), reason, reference)
    }

    /// A debit of `amount` credits. The sign of `amount` is forced negative.
    #[must_use]
    pub fn debit(member_id: MemberId, amount: i64, reason: EntryReason, reference: EntryRef) -> Self {
        Self::signed(member_id, -amount.abs(), reason, reference)
    }

    /// An entry with the sign given by the caller, for staff adjustments.
    #[must_use]
    pub fn signed(member_id: MemberId, amount: i64, reason: EntryReason, reference: EntryRef) -> Self {
        Self {
            id: LedgerEntryId::generate(),
            member_id,
            amount,
            reason,
            reference,
            created_at: Utc::now(),
        }
    }
}

/// Sum entry amounts into a balance.
pub fn balance<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> i64 {
    entries.into_iter().map(|e| e.amount).sum()
}

//! Identifier types for the booking engine.
//!
//! Every stored row gets a strongly-typed identifier so a booking id can never be
//! passed where an occurrence id is expected.
//!
//! # Macro-based ID Types
//!
//! The `uuid_id_type!` macro generates the UUID-backed identifiers with a
//! uniform set of serialization, parsing, and display impls. Ledger entries use
//! a ULID instead so that a member's history sorts chronologically by key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Define a UUID-based identifier type with standard trait implementations.
///
/// Generates a newtype around `uuid::Uuid` with:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `Serialize`, `Deserialize` (as string)
/// - `FromStr`, `Display`, `Debug`
/// - `TryFrom<String>`, `Into<String>`
/// - `AsRef<[u8]>`
macro_rules! uuid_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the bytes of the UUID (16 bytes).
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }

            /// Rebuild the identifier from its 16 key bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(uuid::Uuid::from_bytes(bytes))
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
                Ok(Self(uuid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }
    };
}

uuid_id_type!(MemberId, "A gym member identifier.\n\nResolved and authenticated upstream; the engine trusts it as given.");
uuid_id_type!(TrainerId, "A trainer identifier.");
uuid_id_type!(TemplateId, "A recurring template identifier.");
uuid_id_type!(OccurrenceId, "A dated occurrence identifier.");
uuid_id_type!(BookingId, "A booking identifier.");
uuid_id_type!(BlockId, "An unavailable block identifier.");
uuid_id_type!(OfferingId, "A one-off offering identifier.\n\nOfferings live in the external product catalog.");

/// A ledger entry identifier using ULID for time-ordering.
///
/// Entry keys are `member || entry_id`, so iterating a member's prefix yields
/// their history oldest first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerEntryId(Ulid);

impl LedgerEntryId {
    /// Generate a new `LedgerEntryId` with the current timestamp.
    ///
    /// IDs generated within the same millisecond are not guaranteed to sort in
    /// creation order; callers that append several entries back to back should
    /// use [`LedgerEntryId::after`].
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Generate an id that sorts strictly after `previous`.
    #[must_use]
    pub fn after(previous: Self) -> Self {
        let fresh = Ulid::new();
        if fresh > previous.0 {
            Self(fresh)
        } else {
            Self(previous.0.increment().unwrap_or(fresh))
        }
    }

    /// Return the bytes of the ULID (16 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Create from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `IdError::InvalidUlid` if the bytes are not a valid ULID.
    pub fn from_bytes(bytes: [u8; 16]) -> Result<Self, IdError> {
        Ok(Self(Ulid::from_bytes(bytes)))
    }
}

impl FromStr for LedgerEntryId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for LedgerEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerEntryId({})", self.0)
    }
}

impl fmt::Display for LedgerEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for LedgerEntryId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LedgerEntryId> for String {
    fn from(id: LedgerEntryId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}

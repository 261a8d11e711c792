//! Error types for gym storage.

use gym_core::BookingError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A row lock could not be taken within the configured timeout.
    /// Nothing was committed.
    #[error("storage busy: {0}")]
    Busy(String),

    /// A domain precondition failed inside the transaction.
    #[error(transparent)]
    Rejected(#[from] BookingError),
}

impl StoreError {
    /// The domain rejection, if this is one.
    #[must_use]
    pub const fn rejection(&self) -> Option<&BookingError> {
        match self {
            Self::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> Self {
        match err.kind() {
            rocksdb::ErrorKind::Busy | rocksdb::ErrorKind::TimedOut => Self::Busy(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

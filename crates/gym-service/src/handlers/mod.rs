//! API handlers.

use std::str::FromStr;

use gym_core::IdError;

use crate::error::ApiError;

pub mod admin;
pub mod availability;
pub mod bookings;
pub mod credits;
pub mod health;
pub mod settings;

/// Default page size for list endpoints.
pub(crate) const DEFAULT_LIMIT: usize = 50;

/// Largest page size a caller may ask for.
pub(crate) const MAX_LIMIT: usize = 100;

pub(crate) const fn default_limit() -> usize {
    DEFAULT_LIMIT
}

/// Parse an id from a path segment.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = IdError>,
{
    raw.parse::<T>().map_err(ApiError::from)
}

//! Request authentication extractors.
//!
//! - `MemberAuth` - member identity resolved upstream and passed in `x-member-id`
//! - `StaffAuth` - staff access via API key in `x-api-key`

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use gym_core::MemberId;

use crate::crypto::constant_time_eq;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the member id set by the upstream gateway.
pub const MEMBER_HEADER: &str = "x-member-id";

/// Header carrying the staff API key.
pub const STAFF_KEY_HEADER: &str = "x-api-key";

/// An authenticated member.
///
/// The gateway in front of this service authenticates members; the engine
/// trusts the id it forwards.
#[derive(Debug, Clone, Copy)]
pub struct MemberAuth {
    /// The member ID.
    pub member_id: MemberId,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MemberAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let member_id = parts
            .headers
            .get(MEMBER_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?
            .parse::<MemberId>()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(Self { member_id })
    }
}

/// Staff access.
#[derive(Debug, Clone)]
pub struct StaffAuth {
    /// Staff identifier from `x-staff-id`, for audit logging.
    pub staff_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for StaffAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get(STAFF_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        // No key configured means staff routes are closed.
        let expected_key = state
            .config
            .staff_api_key
            .as_ref()
            .ok_or(ApiError::Unauthorized)?;

        if !constant_time_eq(api_key, expected_key) {
            return Err(ApiError::Unauthorized);
        }

        let staff_id = parts
            .headers
            .get("x-staff-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("staff")
            .to_string();

        tracing::debug!(staff_id = %staff_id, "Staff authenticated");

        Ok(Self { staff_id })
    }
}

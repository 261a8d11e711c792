//! Member credit balance and ledger handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use gym_core::{LedgerEntry, MemberId};

use crate::auth::MemberAuth;
use crate::error::ApiError;
use crate::handlers::{default_limit, MAX_LIMIT};
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Member.
    pub member_id: MemberId,
    /// Credits, the sum of all ledger entries.
    pub balance: i64,
}

/// Get the member's credit balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: MemberAuth,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.engine.balance(auth.member_id).await?;
    Ok(Json(BalanceResponse {
        member_id: auth.member_id,
        balance,
    }))
}

/// Ledger list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    /// Maximum number of entries to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

/// List entries response.
#[derive(Debug, Serialize)]
pub struct ListEntriesResponse {
    /// Entries (newest first).
    pub entries: Vec<LedgerEntry>,
    /// Whether there are more entries.
    pub has_more: bool,
}

/// List the member's ledger history.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    auth: MemberAuth,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<ListEntriesResponse>, ApiError> {
    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(MAX_LIMIT);
    let mut entries = state
        .engine
        .ledger(auth.member_id, limit + 1, query.offset)
        .await?;

    let has_more = entries.len() > limit;
    entries.truncate(limit);

    Ok(Json(ListEntriesResponse { entries, has_more }))
}

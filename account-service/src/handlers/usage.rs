use super::{optional_body, validate_request};
use crate::dtos::{ConsumeRequest, ConsumeResponse, HistoryQuery};
use crate::middleware::CurrentUser;
use crate::services::ledger::{HistoryPeriod, HistorySummary};
use crate::services::{AccountError, EntitlementSnapshot};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use chrono::Utc;

pub async fn get_usage(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<EntitlementSnapshot>, AccountError> {
    let snapshot = state.accounts.get_entitlement(&user.id, Utc::now()).await?;
    Ok(Json(snapshot))
}

/// Consumes `count` messages (default 1). Exhaustion answers 429 with
/// `upgradeRequired`.
pub async fn consume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<ConsumeRequest>, JsonRejection>,
) -> Result<Json<ConsumeResponse>, AccountError> {
    let req = optional_body(body)?;
    validate_request(&req)?;
    let count = req.count.unwrap_or(1);

    let (pool, usage) = state.accounts.consume(&user.id, count, Utc::now()).await?;
    Ok(Json(ConsumeResponse {
        consumed: count,
        source: pool.as_str(),
        usage,
    }))
}

pub async fn usage_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistorySummary>, AccountError> {
    let period = HistoryPeriod::parse(query.period.as_deref());
    let summary = state
        .accounts
        .usage_history(&user.id, period, Utc::now())
        .await?;
    Ok(Json(summary))
}

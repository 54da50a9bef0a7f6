use crate::services::{AccountError, SweepReport};
use crate::AppState;
use axum::{extract::State, Json};
use chrono::Utc;

/// Runs the batch expiry sweep immediately.
pub async fn expire_subscriptions(
    State(state): State<AppState>,
) -> Result<Json<SweepReport>, AccountError> {
    let report = state.sweeper.run_once(Utc::now()).await?;
    Ok(Json(report))
}

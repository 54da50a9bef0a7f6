use crate::dtos::{QuoteQuery, QuoteResponse, RechargeHistoryResponse, RechargeRequest};
use crate::middleware::CurrentUser;
use crate::services::recharge::RechargeReceipt;
use crate::services::AccountError;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;

pub async fn quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<QuoteResponse>, AccountError> {
    let total_price = state.accounts.quote(query.messages)?;
    let pricing = state.accounts.pricing();
    Ok(Json(QuoteResponse {
        messages: query.messages,
        total_price,
        base_price: pricing.base_price,
        base_pack: pricing.base_pack,
        price_per_message: pricing.price_per_message,
    }))
}

pub async fn purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<RechargeRequest>,
) -> Result<impl IntoResponse, AccountError> {
    let receipt: RechargeReceipt = state
        .accounts
        .purchase_recharge(&user.id, req.messages, req.payment_ref, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn history(CurrentUser(user): CurrentUser) -> Json<RechargeHistoryResponse> {
    Json(RechargeHistoryResponse::from(&user))
}

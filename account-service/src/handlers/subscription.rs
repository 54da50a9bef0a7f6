use super::{optional_body, validate_request};
use crate::dtos::{
    CancelRequest, CancelResponse, ChangePlanRequest, ContactSalesResponse, PlanChangeResponse,
};
use crate::middleware::CurrentUser;
use crate::models::{Plan, SubscriptionView};
use crate::services::subscription::PlanChangeOutcome;
use crate::services::AccountError;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

pub async fn get_subscription(CurrentUser(user): CurrentUser) -> Json<SubscriptionView> {
    Json(user.subscription_view())
}

pub async fn change_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ChangePlanRequest>,
) -> Result<Response, AccountError> {
    validate_request(&req)?;
    let plan: Plan = req
        .plan_id
        .parse()
        .map_err(|e| AccountError::Validation(format!("{}", e)))?;

    let outcome = state
        .accounts
        .change_plan(&user.id, plan, req.billing_cycle, Utc::now())
        .await?;

    Ok(match outcome {
        PlanChangeOutcome::Changed(change) => Json(PlanChangeResponse::from(change)).into_response(),
        PlanChangeOutcome::ContactSales => Json(ContactSalesResponse {
            contact_required: true,
            sales_contact: state.sales_contact_email.clone(),
        })
        .into_response(),
    })
}

pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Json<CancelResponse>, AccountError> {
    let req = optional_body(body)?;
    validate_request(&req)?;

    let cancellation = state
        .accounts
        .cancel(&user.id, req.reason, Utc::now())
        .await?;

    Ok(Json(CancelResponse {
        message: "Subscription will be cancelled at the end of the current period".to_string(),
        plan: cancellation.plan,
        cancel_at_period_end: true,
        access_until: cancellation.access_until,
    }))
}

pub async fn reactivate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SubscriptionView>, AccountError> {
    let view = state.accounts.reactivate(&user.id, Utc::now()).await?;
    Ok(Json(view))
}

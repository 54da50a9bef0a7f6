use super::validate_request;
use crate::dtos::{AccountResponse, CreateAccountRequest, FeatureAccessResponse};
use crate::middleware::CurrentUser;
use crate::services::AccountError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;

/// Provisions a community account for a freshly registered identity.
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, AccountError> {
    validate_request(&req)?;
    if !req.has_identity() {
        return Err(AccountError::Validation(
            "One of email, googleId or githubId is required".to_string(),
        ));
    }

    let user = state.accounts.provision(req.into(), Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(&user))))
}

pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<AccountResponse> {
    Json(AccountResponse::from(&user))
}

pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AccountError> {
    state.accounts.deactivate(&user.id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_feature(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(feature): Path<String>,
) -> Result<Json<FeatureAccessResponse>, AccountError> {
    let (plan, allowed) = state
        .accounts
        .has_feature(&user.id, &feature, Utc::now())
        .await?;
    Ok(Json(FeatureAccessResponse {
        feature,
        plan,
        allowed,
    }))
}

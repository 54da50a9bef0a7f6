pub mod accounts;
pub mod admin;
pub mod billing;
pub mod health;
pub mod plans;
pub mod recharge;
pub mod subscription;
pub mod usage;

use crate::services::AccountError;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use validator::Validate;

/// Runs `validator` rules, reporting failures as 422.
pub(crate) fn validate_request<T: Validate>(req: &T) -> Result<(), AccountError> {
    req.validate()
        .map_err(|e| AccountError::Validation(format!("Validation error: {}", e)))
}

/// Body for endpoints whose payload may be omitted. A request without a JSON
/// body gets `T::default()`; a body that fails to parse is a 422.
pub(crate) fn optional_body<T: Default>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AccountError> {
    match body {
        Ok(Json(req)) => Ok(req),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(AccountError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        ))),
    }
}

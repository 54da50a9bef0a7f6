//! Account context middleware.
//!
//! The BFF authenticates the caller and forwards the user id in `X-User-ID`.
//! Every authenticated request loads the account, applies lazy rollover and
//! the per-request expiry check, persists any change, and hands the refreshed
//! snapshot to handlers through request extensions.

use crate::models::User;
use crate::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use service_core::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The refreshed account for the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub async fn account_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        Some(id) => id.to_string(),
        None => {
            return AppError::Unauthorized(anyhow::anyhow!(
                "Missing X-User-ID header (required from BFF)"
            ))
            .into_response()
        }
    };

    tracing::Span::current().record("user_id", user_id.as_str());

    let user = match state.accounts.current(&user_id, Utc::now()).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    if !user.is_active {
        tracing::warn!(user_id = %user_id, "Request from deactivated account");
        return AppError::Forbidden(anyhow::anyhow!("Account is deactivated")).into_response();
    }

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

/// Must run inside `account_middleware`.
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) if user.is_admin() => next.run(request).await,
        _ => {
            tracing::warn!("Non-admin request to admin route");
            AppError::Forbidden(anyhow::anyhow!("Admin role required")).into_response()
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Account context missing from request extensions"
                ))
            })
    }
}

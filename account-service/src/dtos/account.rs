use crate::models::{NewUser, Plan, Role, SubscriptionView, User};
use crate::services::EntitlementSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sent by the auth collaborator after registration, verification or OAuth login.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password_hash: Option<String>,

    #[validate(length(min = 1))]
    pub google_id: Option<String>,

    #[validate(length(min = 1))]
    pub github_id: Option<String>,

    #[serde(default)]
    pub role: Role,
}

impl CreateAccountRequest {
    pub fn has_identity(&self) -> bool {
        self.email.is_some() || self.google_id.is_some() || self.github_id.is_some()
    }
}

impl From<CreateAccountRequest> for NewUser {
    fn from(req: CreateAccountRequest) -> Self {
        NewUser {
            name: req.name,
            email: req.email,
            password_hash: req.password_hash,
            google_id: req.google_id,
            github_id: req.github_id,
            role: req.role,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    pub plan: Plan,
    pub is_active: bool,
    pub subscription: SubscriptionView,
    pub usage: EntitlementSnapshot,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for AccountResponse {
    fn from(user: &User) -> Self {
        AccountResponse {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            plan: user.plan,
            is_active: user.is_active,
            subscription: user.subscription_view(),
            usage: crate::services::entitlement::snapshot(user),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAccessResponse {
    pub feature: String,
    pub plan: Plan,
    pub allowed: bool,
}

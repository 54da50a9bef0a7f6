use super::billing::{Invoice, TransactionRecord};
use super::plan::Plan;
use super::recharge::Recharge;
use super::subscription::{Subscription, SubscriptionView};
use super::usage::{DailyUsage, Usage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Identity supplied by the auth collaborator when an account is provisioned.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub github_id: Option<String>,
    pub role: Role,
}

/// The account aggregate. Every sub-record is owned and only changed through the
/// engine services operating on `&mut User`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_id: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub plan: Plan,
    pub is_active: bool,
    pub subscription: Subscription,
    pub usage: Usage,
    #[serde(default)]
    pub recharge: Recharge,
    #[serde(default)]
    pub usage_history: Vec<DailyUsage>,
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every save.
    #[serde(default)]
    pub version: i64,
}

impl User {
    /// A fresh account on the community tier.
    pub fn community(profile: NewUser, messages_limit: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: profile.name,
            email: profile.email.map(|e| e.trim().to_lowercase()),
            password_hash: profile.password_hash,
            google_id: profile.google_id,
            github_id: profile.github_id,
            role: profile.role,
            plan: Plan::Community,
            is_active: true,
            subscription: Subscription::default(),
            usage: Usage::starting(messages_limit, now),
            recharge: Recharge::default(),
            usage_history: Vec::new(),
            transactions: Vec::new(),
            invoices: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn subscription_view(&self) -> SubscriptionView {
        SubscriptionView {
            plan: self.plan,
            status: self.subscription.status,
            current_period_start: self.subscription.current_period_start,
            current_period_end: self.subscription.current_period_end,
            cancel_at_period_end: self.subscription.cancel_at_period_end,
            billing_cycle: self.subscription.billing_cycle,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Soft deactivation: the email is mangled so it can be registered again.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        if let Some(email) = self.email.take() {
            self.email = Some(format!("deleted_{}_{}", now.timestamp(), email));
        }
        self.is_active = false;
        self.updated_at = now;
    }
}

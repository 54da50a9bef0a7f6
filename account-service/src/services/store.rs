//! Persistence seam for the `User` aggregate.

use crate::models::{Plan, SubscriptionStatus, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored document version does not match")]
    VersionConflict,

    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    async fn load(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Compare-and-swap on `user.version`. On success the stored and in-memory
    /// versions are both incremented; a stale version yields `VersionConflict`.
    async fn save(&self, user: &mut User) -> Result<(), StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Ids of paid, active subscriptions whose period ended before `now`.
    async fn find_expired_ids(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// True when the sweeper should pick this user up.
pub fn is_sweep_candidate(user: &User, now: DateTime<Utc>) -> bool {
    user.plan != Plan::Community
        && user.subscription.status == SubscriptionStatus::Active
        && user
            .subscription
            .current_period_end
            .is_some_and(|end| end < now)
}

/// Process-local store used by tests and local runs. Inserts are serialised
/// so the identity check and the write are one step.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, User>,
    provisioning: Mutex<()>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn identity_taken(&self, user: &User) -> Option<&'static str> {
        self.users.iter().find_map(|entry| {
            let other = entry.value();
            if other.id == user.id {
                Some("id")
            } else if user.email.is_some() && other.email == user.email {
                Some("email")
            } else if user.google_id.is_some() && other.google_id == user.google_id {
                Some("google_id")
            } else if user.github_id.is_some() && other.github_id == user.github_id {
                Some("github_id")
            } else {
                None
            }
        })
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let _guard = self
            .provisioning
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(field) = self.identity_taken(user) {
            return Err(StoreError::Duplicate(field.to_string()));
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, user: &mut User) -> Result<(), StoreError> {
        let mut stored = self
            .users
            .get_mut(&user.id)
            .ok_or(StoreError::VersionConflict)?;
        if stored.version != user.version {
            return Err(StoreError::VersionConflict);
        }
        user.version += 1;
        *stored = user.clone();
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().email.as_deref() == Some(email.as_str()))
            .map(|entry| entry.value().clone()))
    }

    async fn find_expired_ids(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        Ok(self
            .users
            .iter()
            .filter(|entry| is_sweep_candidate(entry.value(), now))
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

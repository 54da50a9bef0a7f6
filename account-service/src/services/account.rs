//! Account orchestration: load, refresh, mutate and persist the aggregate with
//! optimistic concurrency, then fire notifications.

use super::catalog;
use super::entitlement::{self, EntitlementSnapshot, Pool, Refresh};
use super::error::AccountError;
use super::ledger::{self, HistoryPeriod, HistorySummary};
use super::metrics;
use super::notifier::AccountNotifier;
use super::recharge::{self, RechargePricing, RechargeReceipt};
use super::store::{StoreError, UserStore};
use super::subscription::{self, Cancellation, PlanChangeOutcome};
use crate::models::{BillingCycle, NewUser, Plan, SubscriptionView, User};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Attempts of the load-mutate-save cycle before giving up on contention.
const MAX_SAVE_ATTEMPTS: usize = 5;

/// Largest count accepted by a single consumption request.
pub const MAX_CONSUME_COUNT: u32 = 1000;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    notifier: Arc<dyn AccountNotifier>,
    pricing: RechargePricing,
}

/// Result of a mutation: the persisted user, the operation output and what the
/// pre-mutation refresh changed.
struct Mutation<T> {
    user: User,
    output: T,
    refresh: Refresh,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn UserStore>,
        notifier: Arc<dyn AccountNotifier>,
        pricing: RechargePricing,
    ) -> Self {
        Self {
            store,
            notifier,
            pricing,
        }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn pricing(&self) -> &RechargePricing {
        &self.pricing
    }

    #[tracing::instrument(skip(self, profile), fields(email = ?profile.email))]
    pub async fn provision(&self, profile: NewUser, now: DateTime<Utc>) -> Result<User, AccountError> {
        if let Some(email) = profile.email.as_deref() {
            if self.store.find_by_email(email).await?.is_some() {
                return Err(AccountError::Conflict(
                    "An account with this email already exists".to_string(),
                ));
            }
        }

        let user = User::community(profile, catalog::quota(Plan::Community).as_limit(), now);
        self.store.insert(&user).await?;
        tracing::info!(user_id = %user.id, "Account provisioned");
        Ok(user)
    }

    async fn load(&self, user_id: &str) -> Result<User, AccountError> {
        self.store
            .load(user_id)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("Account {} not found", user_id)))
    }

    /// Runs `op` against a freshly loaded and refreshed user and persists the
    /// result with a compare-and-swap, retrying the whole cycle on conflicts.
    /// Nothing is written when neither the refresh nor `op` changed the user.
    /// When `op` fails, the refreshed state is still persisted before the
    /// error is returned.
    async fn mutate<T, F>(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        mut op: F,
    ) -> Result<Mutation<T>, AccountError>
    where
        F: FnMut(&mut User) -> Result<T, AccountError>,
    {
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let original = self.load(user_id).await?;
            let previous_plan = original.plan;
            let mut refreshed = original.clone();
            let refresh = entitlement::refresh(&mut refreshed, now);

            let mut candidate = refreshed.clone();
            let (mut user, result) = match op(&mut candidate) {
                Ok(output) => (candidate, Ok(output)),
                Err(e) => (refreshed, Err(e)),
            };

            if user != original {
                user.updated_at = now;
                match self.store.save(&mut user).await {
                    Ok(()) => {}
                    Err(StoreError::VersionConflict) => {
                        tracing::debug!(user_id, attempt, "Version conflict, retrying");
                        continue;
                    }
                    Err(e) => {
                        tracing::error!(user_id, error = %e, "Failed to save account");
                        return Err(e.into());
                    }
                }
            }

            if refresh.expired {
                metrics::record_subscription_operation("expire");
                if let Err(e) = self.notifier.notify_downgraded(&user, previous_plan).await {
                    tracing::warn!(user_id, error = %e, "Failed to send downgrade notification");
                }
            }

            let output = result?;
            return Ok(Mutation {
                user,
                output,
                refresh,
            });
        }

        tracing::warn!(user_id, "Giving up after repeated version conflicts");
        Err(AccountError::Conflict(
            "Account is being modified concurrently, retry later".to_string(),
        ))
    }

    /// Loads the user with lazy rollover and expiry applied and persisted.
    #[tracing::instrument(skip(self))]
    pub async fn current(&self, user_id: &str, now: DateTime<Utc>) -> Result<User, AccountError> {
        Ok(self.mutate(user_id, now, |_| Ok(())).await?.user)
    }

    /// Same as [`current`](Self::current), also reporting what changed.
    pub async fn refresh_account(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Refresh, AccountError> {
        Ok(self.mutate(user_id, now, |_| Ok(())).await?.refresh)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_entitlement(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<EntitlementSnapshot, AccountError> {
        let mutation = self
            .mutate(user_id, now, |user| Ok(entitlement::get_entitlement(user, now)))
            .await?;
        Ok(mutation.output)
    }

    #[tracing::instrument(skip(self))]
    pub async fn consume(
        &self,
        user_id: &str,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<(Pool, EntitlementSnapshot), AccountError> {
        if !(1..=MAX_CONSUME_COUNT).contains(&count) {
            return Err(AccountError::Validation(format!(
                "Consumption count must be between 1 and {}",
                MAX_CONSUME_COUNT
            )));
        }

        let result = self
            .mutate(user_id, now, |user| entitlement::try_consume(user, count, now))
            .await;

        match result {
            Ok(Mutation { user, output, .. }) => {
                metrics::record_consumption(output.as_str(), count);
                tracing::info!(user_id, count, pool = output.as_str(), "Messages consumed");
                Ok((output, entitlement::snapshot(&user)))
            }
            Err(e @ AccountError::QuotaExceeded { .. }) => {
                metrics::record_quota_exceeded();
                tracing::info!(user_id, count, "Consumption rejected, quota exceeded");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn usage_history(
        &self,
        user_id: &str,
        period: HistoryPeriod,
        now: DateTime<Utc>,
    ) -> Result<HistorySummary, AccountError> {
        let user = self.current(user_id, now).await?;
        Ok(ledger::aggregate_history(&user.usage_history, period, now))
    }

    pub fn quote(&self, count: u32) -> Result<Decimal, AccountError> {
        self.pricing.quote_for_messages(count)
    }

    #[tracing::instrument(skip(self, payment_ref))]
    pub async fn purchase_recharge(
        &self,
        user_id: &str,
        count: u32,
        payment_ref: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RechargeReceipt, AccountError> {
        // Payment is simulated; a reference is minted when the caller has none.
        let payment_ref =
            payment_ref.unwrap_or_else(|| format!("sim_{}", uuid::Uuid::new_v4().simple()));
        let pricing = &self.pricing;

        let mutation = self
            .mutate(user_id, now, |user| {
                recharge::purchase(user, pricing, count, &payment_ref, now)
            })
            .await?;

        metrics::record_recharge_purchase();
        Ok(mutation.output)
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_plan(
        &self,
        user_id: &str,
        plan: Plan,
        billing_cycle: Option<BillingCycle>,
        now: DateTime<Utc>,
    ) -> Result<PlanChangeOutcome, AccountError> {
        let Mutation { user, output, .. } = self
            .mutate(user_id, now, |user| {
                subscription::change_plan(user, plan, billing_cycle, now)
            })
            .await?;

        if let PlanChangeOutcome::Changed(change) = &output {
            metrics::record_subscription_operation("change_plan");
            if let Err(e) = self.notifier.notify_plan_changed(&user, change).await {
                tracing::warn!(user_id, error = %e, "Failed to send plan change notification");
            }
        }
        Ok(output)
    }

    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        user_id: &str,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Cancellation, AccountError> {
        let Mutation { user, output, .. } = self
            .mutate(user_id, now, |user| {
                subscription::cancel(user, reason.as_deref(), now)
            })
            .await?;

        metrics::record_subscription_operation("cancel");
        if let Err(e) = self.notifier.notify_cancelled(&user, &output).await {
            tracing::warn!(user_id, error = %e, "Failed to send cancellation notification");
        }
        Ok(output)
    }

    #[tracing::instrument(skip(self))]
    pub async fn reactivate(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionView, AccountError> {
        let mutation = self
            .mutate(user_id, now, |user| subscription::reactivate(user, now))
            .await?;
        metrics::record_subscription_operation("reactivate");
        Ok(mutation.user.subscription_view())
    }

    pub async fn has_feature(
        &self,
        user_id: &str,
        feature: &str,
        now: DateTime<Utc>,
    ) -> Result<(Plan, bool), AccountError> {
        let user = self.current(user_id, now).await?;
        Ok((user.plan, catalog::resolve_feature_access(user.plan, feature)))
    }

    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, user_id: &str, now: DateTime<Utc>) -> Result<(), AccountError> {
        self.mutate(user_id, now, |user| {
            if !user.is_active {
                return Err(AccountError::NoOp("Account is already deactivated".to_string()));
            }
            user.deactivate(now);
            Ok(())
        })
        .await?;
        tracing::info!(user_id, "Account deactivated");
        Ok(())
    }
}

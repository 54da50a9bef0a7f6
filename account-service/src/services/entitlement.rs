//! Entitlement resolver: the read and decision surface over catalog, ledger,
//! recharge balance and subscription state.

use super::catalog::{self, Quota};
use super::error::AccountError;
use super::{ledger, recharge, subscription};
use crate::models::User;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// A message count, or no limit at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Count(u32),
    Unlimited,
}

impl Serialize for Capacity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Capacity::Count(n) => serializer.serialize_u32(*n),
            Capacity::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementSnapshot {
    pub used: u32,
    pub limit: Capacity,
    pub remaining: Capacity,
    pub percentage: u32,
    pub reset_date: DateTime<Utc>,
    pub recharge_balance: u32,
}

/// Which counter a consumption was charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    Plan,
    Recharge,
}

impl Pool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pool::Plan => "plan",
            Pool::Recharge => "recharge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Refresh {
    pub rolled_over: bool,
    pub expired: bool,
}

impl Refresh {
    pub fn changed(&self) -> bool {
        self.rolled_over || self.expired
    }
}

/// Brings the aggregate up to date with `now`: lazy period rollover first,
/// then the per-request expiry check.
pub fn refresh(user: &mut User, now: DateTime<Utc>) -> Refresh {
    let rolled_over = ledger::rollover_if_due(user, now);
    let expired = subscription::is_lapsed(user, now) && subscription::force_expire(user, now);
    Refresh {
        rolled_over,
        expired,
    }
}

/// Computes the entitlement view of an already refreshed user.
pub fn snapshot(user: &User) -> EntitlementSnapshot {
    let used = user.usage.messages_used;
    let balance = user.recharge.balance;

    let (limit, remaining, percentage) = match catalog::quota(user.plan) {
        Quota::Unlimited => (Capacity::Unlimited, Capacity::Unlimited, 0),
        Quota::Limited(quota) => {
            let available = quota.saturating_add(balance);
            let percentage = if available == 0 {
                100
            } else {
                let pct = (f64::from(used) / f64::from(available) * 100.0).round();
                pct.min(100.0) as u32
            };
            (
                Capacity::Count(quota),
                Capacity::Count(available.saturating_sub(used)),
                percentage,
            )
        }
    };

    EntitlementSnapshot {
        used,
        limit,
        remaining,
        percentage,
        reset_date: user.usage.reset_date,
        recharge_balance: balance,
    }
}

/// Refreshes the user, then computes its snapshot.
pub fn get_entitlement(user: &mut User, now: DateTime<Utc>) -> EntitlementSnapshot {
    refresh(user, now);
    snapshot(user)
}

/// Charges `count` messages to exactly one pool: the plan quota while the
/// whole request fits, otherwise the recharge balance.
pub fn try_consume(user: &mut User, count: u32, now: DateTime<Utc>) -> Result<Pool, AccountError> {
    if count == 0 {
        return Err(AccountError::Validation(
            "Consumption count must be at least 1".to_string(),
        ));
    }

    let quota = match catalog::quota(user.plan) {
        Quota::Unlimited => {
            ledger::record_consumption(user, count, now);
            return Ok(Pool::Plan);
        }
        Quota::Limited(quota) => quota,
    };

    let used = user.usage.messages_used;
    let balance = user.recharge.balance;
    let remaining = quota.saturating_add(balance).saturating_sub(used);
    let exceeded = AccountError::QuotaExceeded {
        used,
        limit: i64::from(quota),
        remaining,
    };

    if remaining == 0 {
        return Err(exceeded);
    }

    if used.saturating_add(count) <= quota {
        ledger::record_consumption(user, count, now);
        return Ok(Pool::Plan);
    }

    if balance < count {
        return Err(exceeded);
    }

    if let Err(e) = recharge::consume(user, count) {
        tracing::error!(user_id = %user.id, error = %e, "Recharge balance inconsistent with pre-check");
        return Err(e);
    }
    ledger::track_daily(&mut user.usage_history, count, now.date_naive());
    Ok(Pool::Recharge)
}

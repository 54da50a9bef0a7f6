//! Plan tier and billing cycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Subscription tier. `Community` is the free tier and never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Community,
    Developer,
    Pro,
    Max,
    Enterprise,
}

impl Plan {
    pub const ALL: [Plan; 5] = [
        Plan::Community,
        Plan::Developer,
        Plan::Pro,
        Plan::Max,
        Plan::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Community => "community",
            Plan::Developer => "developer",
            Plan::Pro => "pro",
            Plan::Max => "max",
            Plan::Enterprise => "enterprise",
        }
    }

    /// Position in the upgrade ladder, used to classify plan changes.
    pub fn rank(&self) -> u8 {
        match self {
            Plan::Community => 0,
            Plan::Developer => 1,
            Plan::Pro => 2,
            Plan::Max => 3,
            Plan::Enterprise => 4,
        }
    }

    pub fn is_community(&self) -> bool {
        matches!(self, Plan::Community)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown plan '{0}'")]
pub struct UnknownPlan(pub String);

impl FromStr for Plan {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "community" => Ok(Plan::Community),
            "developer" => Ok(Plan::Developer),
            "pro" => Ok(Plan::Pro),
            "max" => Ok(Plan::Max),
            "enterprise" => Ok(Plan::Enterprise),
            _ => Err(UnknownPlan(s.to_string())),
        }
    }
}

/// Billing cycle for paid plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }

    /// Length of one period in calendar months.
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Yearly => 12,
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

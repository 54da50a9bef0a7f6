//! Entitlement catalog: the static plan table.

use crate::models::{BillingCycle, Plan};
use rust_decimal::Decimal;
use serde::Serialize;

/// Monthly message allowance for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unlimited,
}

impl Quota {
    /// Storage form, with `-1` as the unlimited sentinel.
    pub fn as_limit(&self) -> i64 {
        match self {
            Quota::Limited(n) => i64::from(*n),
            Quota::Unlimited => -1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlanDefinition {
    pub plan: Plan,
    pub name: &'static str,
    pub messages: Quota,
    pub features: &'static [&'static str],
    /// `None` for plans sold through sales.
    pub monthly_price: Option<u32>,
    pub yearly_price: Option<u32>,
}

impl PlanDefinition {
    pub fn price(&self, cycle: BillingCycle) -> Option<Decimal> {
        let price = match cycle {
            BillingCycle::Monthly => self.monthly_price,
            BillingCycle::Yearly => self.yearly_price,
        };
        price.map(Decimal::from)
    }
}

const PLANS: [PlanDefinition; 5] = [
    PlanDefinition {
        plan: Plan::Community,
        name: "Community",
        messages: Quota::Limited(50),
        features: &["basic_chat", "community_support"],
        monthly_price: Some(0),
        yearly_price: Some(0),
    },
    PlanDefinition {
        plan: Plan::Developer,
        name: "Developer",
        messages: Quota::Limited(600),
        features: &["basic_chat", "email_support", "api_access", "usage_history"],
        monthly_price: Some(19),
        yearly_price: Some(190),
    },
    PlanDefinition {
        plan: Plan::Pro,
        name: "Pro",
        messages: Quota::Limited(1500),
        features: &[
            "basic_chat",
            "priority_support",
            "api_access",
            "usage_history",
            "advanced_models",
            "export",
        ],
        monthly_price: Some(49),
        yearly_price: Some(490),
    },
    PlanDefinition {
        plan: Plan::Max,
        name: "Max",
        messages: Quota::Limited(5000),
        features: &[
            "basic_chat",
            "priority_support",
            "api_access",
            "usage_history",
            "advanced_models",
            "export",
            "team_management",
            "custom_integrations",
        ],
        monthly_price: Some(99),
        yearly_price: Some(990),
    },
    PlanDefinition {
        plan: Plan::Enterprise,
        name: "Enterprise",
        messages: Quota::Unlimited,
        features: &["all"],
        monthly_price: None,
        yearly_price: None,
    },
];

pub fn definition(plan: Plan) -> &'static PlanDefinition {
    match plan {
        Plan::Community => &PLANS[0],
        Plan::Developer => &PLANS[1],
        Plan::Pro => &PLANS[2],
        Plan::Max => &PLANS[3],
        Plan::Enterprise => &PLANS[4],
    }
}

pub fn all() -> &'static [PlanDefinition] {
    &PLANS
}

pub fn quota(plan: Plan) -> Quota {
    definition(plan).messages
}

/// True when the plan grants `feature`, either by name or through `"all"`.
pub fn resolve_feature_access(plan: Plan, feature: &str) -> bool {
    definition(plan)
        .features
        .iter()
        .any(|f| *f == "all" || *f == feature)
}

/// Public listing entry for `GET /plans`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub id: Plan,
    pub name: &'static str,
    pub messages: i64,
    pub features: Vec<&'static str>,
    pub monthly_price: Option<u32>,
    pub yearly_price: Option<u32>,
}

impl From<&PlanDefinition> for PlanSummary {
    fn from(def: &PlanDefinition) -> Self {
        Self {
            id: def.plan,
            name: def.name,
            messages: def.messages.as_limit(),
            features: def.features.to_vec(),
            monthly_price: def.monthly_price,
            yearly_price: def.yearly_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_plan() {
        for plan in Plan::ALL {
            assert_eq!(definition(plan).plan, plan);
        }
    }

    #[test]
    fn community_quota_is_fifty_and_enterprise_is_unlimited() {
        assert_eq!(quota(Plan::Community), Quota::Limited(50));
        assert_eq!(quota(Plan::Developer), Quota::Limited(600));
        assert_eq!(quota(Plan::Enterprise).as_limit(), -1);
    }

    #[test]
    fn all_feature_grants_everything() {
        assert!(resolve_feature_access(Plan::Enterprise, "team_management"));
        assert!(resolve_feature_access(Plan::Enterprise, "anything_at_all"));
    }

    #[test]
    fn named_features_are_checked_per_plan() {
        assert!(resolve_feature_access(Plan::Pro, "api_access"));
        assert!(!resolve_feature_access(Plan::Community, "api_access"));
        assert!(!resolve_feature_access(Plan::Pro, "team_management"));
    }

    #[test]
    fn enterprise_has_no_list_price() {
        assert!(definition(Plan::Enterprise).price(BillingCycle::Monthly).is_none());
        assert_eq!(
            definition(Plan::Pro).price(BillingCycle::Yearly),
            Some(Decimal::from(490))
        );
    }
}

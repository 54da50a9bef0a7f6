use crate::models::{BillingCycle, Plan};
use crate::services::subscription::PlanChange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlanRequest {
    #[validate(length(min = 1, message = "planId is required"))]
    pub plan_id: String,
    pub billing_cycle: Option<BillingCycle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanChangeResponse {
    pub plan: Plan,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub payment_required: bool,
}

impl From<PlanChange> for PlanChangeResponse {
    fn from(change: PlanChange) -> Self {
        PlanChangeResponse {
            plan: change.plan,
            billing_cycle: change.billing_cycle,
            next_billing_date: change.next_billing_date,
            payment_required: change.payment_required,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSalesResponse {
    pub contact_required: bool,
    pub sales_contact: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelRequest {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub message: String,
    pub plan: Plan,
    pub cancel_at_period_end: bool,
    pub access_until: Option<DateTime<Utc>>,
}

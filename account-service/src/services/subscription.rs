//! Subscription state machine.
//!
//! Every transition mutates the aggregate in place and appends its audit
//! records. Callers persist the user and fire notifications afterwards.

use super::catalog;
use super::error::AccountError;
use crate::models::{
    first_of_next_month, BillingCycle, Invoice, InvoiceItem, Plan, SubscriptionStatus,
    TransactionKind, TransactionRecord, User,
};
use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanChange {
    pub previous_plan: Plan,
    pub plan: Plan,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub payment_required: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanChangeOutcome {
    Changed(PlanChange),
    /// Enterprise is sold through sales; nothing was changed.
    ContactSales,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub plan: Plan,
    pub access_until: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

/// Remaining usage after moving to a lower quota: capped, never reset.
fn cap_usage(used: u32, limit: i64) -> u32 {
    match u32::try_from(limit) {
        Ok(limit) => used.min(limit),
        Err(_) => used,
    }
}

fn period_end(start: DateTime<Utc>, cycle: BillingCycle) -> Result<DateTime<Utc>, AccountError> {
    start
        .checked_add_months(Months::new(cycle.months()))
        .ok_or_else(|| AccountError::Internal(anyhow::anyhow!("billing period out of range")))
}

fn describe_change(kind: TransactionKind, from: Plan, to: Plan) -> String {
    match kind {
        TransactionKind::Subscription => format!("Subscribed to {} plan", to),
        TransactionKind::Upgrade => format!("Upgraded from {} to {}", from, to),
        _ => format!("Downgraded from {} to {}", from, to),
    }
}

pub fn change_plan(
    user: &mut User,
    new_plan: Plan,
    billing_cycle: Option<BillingCycle>,
    now: DateTime<Utc>,
) -> Result<PlanChangeOutcome, AccountError> {
    if new_plan == user.plan {
        return Err(AccountError::NoOp(format!(
            "Already subscribed to the {} plan",
            new_plan
        )));
    }
    if new_plan == Plan::Enterprise {
        return Ok(PlanChangeOutcome::ContactSales);
    }

    let previous_plan = user.plan;
    let cycle = billing_cycle.unwrap_or_default();
    let definition = catalog::definition(new_plan);
    let limit = definition.messages.as_limit();
    let amount = definition.price(cycle).unwrap_or(Decimal::ZERO);

    if new_plan.is_community() {
        user.plan = Plan::Community;
        user.subscription.status = SubscriptionStatus::Active;
        user.subscription.clear_period();
        user.usage.messages_limit = limit;
        user.usage.messages_used = cap_usage(user.usage.messages_used, limit);
        user.usage.reset_date = first_of_next_month(now);
    } else {
        let end = period_end(now, cycle)?;
        user.plan = new_plan;
        user.subscription.status = SubscriptionStatus::Active;
        user.subscription.current_period_start = Some(now);
        user.subscription.current_period_end = Some(end);
        user.subscription.cancel_at_period_end = false;
        user.subscription.billing_cycle = cycle;
        user.usage.messages_limit = limit;
        user.usage.messages_used = 0;
        user.usage.reset_date = first_of_next_month(now);
    }

    let kind = TransactionKind::for_plan_change(previous_plan, new_plan);
    user.transactions.push(
        TransactionRecord::new(kind, describe_change(kind, previous_plan, new_plan), now)
            .with_amount(amount)
            .with_plans(previous_plan, new_plan)
            .with_metadata("billing_cycle", cycle.as_str()),
    );

    let payment_required = amount > Decimal::ZERO;
    if payment_required {
        user.invoices.push(Invoice::paid(
            InvoiceItem {
                description: format!("{} plan ({})", definition.name, cycle),
                quantity: 1,
                unit_price: amount,
                amount,
            },
            now,
        ));
    }
    user.updated_at = now;

    tracing::info!(
        user_id = %user.id,
        from_plan = %previous_plan,
        to_plan = %new_plan,
        billing_cycle = %cycle,
        "Plan changed"
    );

    Ok(PlanChangeOutcome::Changed(PlanChange {
        previous_plan,
        plan: new_plan,
        billing_cycle: cycle,
        next_billing_date: user.subscription.current_period_end,
        payment_required,
        amount,
    }))
}

/// Schedules cancellation at period end. Access is kept until then.
pub fn cancel(
    user: &mut User,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Cancellation, AccountError> {
    if user.plan.is_community() {
        return Err(AccountError::InvalidState(
            "The community plan cannot be cancelled".to_string(),
        ));
    }
    if user.subscription.cancel_at_period_end {
        return Err(AccountError::NoOp(
            "Subscription is already set to cancel at period end".to_string(),
        ));
    }

    user.subscription.cancel_at_period_end = true;
    user.updated_at = now;

    let mut record = TransactionRecord::new(
        TransactionKind::Cancellation,
        format!("Cancelled {} plan", user.plan),
        now,
    )
    .with_plans(user.plan, user.plan);
    if let Some(reason) = reason {
        record = record.with_metadata("reason", reason);
    }
    user.transactions.push(record);

    tracing::info!(user_id = %user.id, plan = %user.plan, "Subscription set to cancel at period end");

    Ok(Cancellation {
        plan: user.plan,
        access_until: user.subscription.current_period_end,
        reason: reason.map(str::to_string),
    })
}

pub fn reactivate(user: &mut User, now: DateTime<Utc>) -> Result<(), AccountError> {
    if !user.subscription.cancel_at_period_end {
        return Err(AccountError::InvalidState(
            "Subscription is not scheduled for cancellation".to_string(),
        ));
    }
    match user.subscription.current_period_end {
        Some(end) if end > now => {}
        _ => {
            return Err(AccountError::Expired(
                "Subscription period has ended, start a new subscription instead".to_string(),
            ))
        }
    }

    user.subscription.cancel_at_period_end = false;
    user.updated_at = now;
    user.transactions.push(
        TransactionRecord::new(
            TransactionKind::Reactivation,
            format!("Reactivated {} plan", user.plan),
            now,
        )
        .with_plans(user.plan, user.plan),
    );

    tracing::info!(user_id = %user.id, plan = %user.plan, "Subscription reactivated");
    Ok(())
}

/// Forced downgrade of a lapsed subscription. Returns `false` when the user
/// is already on community, making repeated application a no-op.
pub fn force_expire(user: &mut User, now: DateTime<Utc>) -> bool {
    if user.plan.is_community() {
        return false;
    }

    let previous_plan = user.plan;
    let limit = catalog::quota(Plan::Community).as_limit();

    user.plan = Plan::Community;
    user.subscription.status = SubscriptionStatus::Inactive;
    user.subscription.clear_period();
    user.usage.messages_limit = limit;
    user.usage.messages_used = cap_usage(user.usage.messages_used, limit);
    user.usage.reset_date = first_of_next_month(now);
    user.updated_at = now;

    user.transactions.push(
        TransactionRecord::new(
            TransactionKind::Downgrade,
            format!("{} plan expired, moved to community", previous_plan),
            now,
        )
        .with_plans(previous_plan, Plan::Community)
        .with_metadata("reason", "expired"),
    );

    tracing::info!(user_id = %user.id, from_plan = %previous_plan, "Subscription expired");
    true
}

/// Per-request expiry check: paid plans whose period end has been reached.
pub fn is_lapsed(user: &User, now: DateTime<Utc>) -> bool {
    !user.plan.is_community()
        && user
            .subscription
            .current_period_end
            .is_some_and(|end| end <= now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvoiceStatus, NewUser};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap()
    }

    fn community_user() -> User {
        User::community(NewUser::default(), 50, now())
    }

    fn paid_user(plan: Plan) -> User {
        let mut user = community_user();
        change_plan(&mut user, plan, Some(BillingCycle::Monthly), now()).unwrap();
        user
    }

    fn changed(outcome: PlanChangeOutcome) -> PlanChange {
        match outcome {
            PlanChangeOutcome::Changed(change) => change,
            PlanChangeOutcome::ContactSales => panic!("expected a plan change"),
        }
    }

    #[test]
    fn monthly_upgrade_ends_one_calendar_month_later() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let mut user = community_user();
        let change = changed(
            change_plan(&mut user, Plan::Developer, Some(BillingCycle::Monthly), start).unwrap(),
        );

        let expected = Utc.with_ymd_and_hms(2024, 4, 15, 9, 0, 0).unwrap();
        assert_eq!(user.subscription.current_period_start, Some(start));
        assert_eq!(user.subscription.current_period_end, Some(expected));
        assert_eq!(change.next_billing_date, Some(expected));
        assert_eq!(user.usage.messages_limit, 600);
        assert!(change.payment_required);
    }

    #[test]
    fn yearly_upgrade_ends_one_calendar_year_later() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let mut user = community_user();
        change_plan(&mut user, Plan::Developer, Some(BillingCycle::Yearly), start).unwrap();

        assert_eq!(
            user.subscription.current_period_end,
            Some(Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap())
        );
        assert_eq!(user.subscription.billing_cycle, BillingCycle::Yearly);
    }

    #[test]
    fn month_end_upgrades_clamp_to_shorter_months() {
        let mut user = community_user();
        change_plan(&mut user, Plan::Pro, None, now()).unwrap();
        assert_eq!(
            user.subscription.current_period_end,
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn changing_to_the_same_plan_is_a_no_op() {
        let mut user = paid_user(Plan::Pro);
        let before = user.clone();
        let err = change_plan(&mut user, Plan::Pro, None, now()).unwrap_err();
        assert!(matches!(err, AccountError::NoOp(_)));
        assert_eq!(user, before);
    }

    #[test]
    fn enterprise_requests_do_not_mutate() {
        let mut user = community_user();
        let before = user.clone();
        let outcome = change_plan(&mut user, Plan::Enterprise, None, now()).unwrap();
        assert_eq!(outcome, PlanChangeOutcome::ContactSales);
        assert_eq!(user, before);
    }

    #[test]
    fn paid_changes_record_transaction_and_invoice() {
        let mut user = paid_user(Plan::Developer);
        change_plan(&mut user, Plan::Max, Some(BillingCycle::Monthly), now()).unwrap();

        let kinds: Vec<TransactionKind> = user.transactions.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TransactionKind::Subscription, TransactionKind::Upgrade]
        );
        let upgrade = &user.transactions[1];
        assert_eq!(upgrade.from_plan, Some(Plan::Developer));
        assert_eq!(upgrade.to_plan, Some(Plan::Max));
        assert_eq!(upgrade.amount, Decimal::from(99));

        assert_eq!(user.invoices.len(), 2);
        assert!(user.invoices.iter().all(|i| i.status == InvoiceStatus::Paid));
    }

    #[test]
    fn downgrade_to_community_caps_usage_and_clears_period() {
        let mut user = paid_user(Plan::Pro);
        user.usage.messages_used = 320;
        user.subscription.cancel_at_period_end = true;

        let change = changed(change_plan(&mut user, Plan::Community, None, now()).unwrap());

        assert_eq!(user.plan, Plan::Community);
        assert_eq!(user.subscription.status, SubscriptionStatus::Active);
        assert!(user.subscription.current_period_end.is_none());
        assert!(!user.subscription.cancel_at_period_end);
        assert_eq!(user.usage.messages_limit, 50);
        assert_eq!(user.usage.messages_used, 50);
        assert!(!change.payment_required);
        assert_eq!(
            user.transactions.last().map(|t| t.kind),
            Some(TransactionKind::Downgrade)
        );
    }

    #[test]
    fn cancel_then_reactivate_keeps_plan_and_status() {
        let mut user = paid_user(Plan::Pro);

        let cancellation = cancel(&mut user, Some("too expensive"), now()).unwrap();
        assert!(user.subscription.cancel_at_period_end);
        assert_eq!(user.plan, Plan::Pro);
        assert_eq!(user.subscription.status, SubscriptionStatus::Active);
        assert_eq!(cancellation.access_until, user.subscription.current_period_end);
        assert_eq!(
            user.transactions
                .last()
                .and_then(|t| t.metadata.get("reason"))
                .map(String::as_str),
            Some("too expensive")
        );

        reactivate(&mut user, now() + Duration::days(3)).unwrap();
        assert!(!user.subscription.cancel_at_period_end);
        assert_eq!(user.plan, Plan::Pro);
    }

    #[test]
    fn community_cannot_be_cancelled() {
        let mut user = community_user();
        assert!(matches!(
            cancel(&mut user, None, now()),
            Err(AccountError::InvalidState(_))
        ));
    }

    #[test]
    fn cancelling_twice_is_a_no_op() {
        let mut user = paid_user(Plan::Developer);
        cancel(&mut user, None, now()).unwrap();
        assert!(matches!(
            cancel(&mut user, None, now()),
            Err(AccountError::NoOp(_))
        ));
    }

    #[test]
    fn reactivate_requires_pending_cancellation() {
        let mut user = paid_user(Plan::Developer);
        assert!(matches!(
            reactivate(&mut user, now()),
            Err(AccountError::InvalidState(_))
        ));
    }

    #[test]
    fn reactivate_after_period_end_is_expired() {
        let mut user = paid_user(Plan::Developer);
        cancel(&mut user, None, now()).unwrap();
        let after_end = user.subscription.current_period_end.unwrap() + Duration::seconds(1);

        assert!(matches!(
            reactivate(&mut user, after_end),
            Err(AccountError::Expired(_))
        ));
        assert!(user.subscription.cancel_at_period_end);
    }

    #[test]
    fn force_expire_downgrades_and_caps_usage() {
        let mut user = paid_user(Plan::Max);
        user.usage.messages_used = 1200;
        let later = now() + Duration::days(40);

        assert!(force_expire(&mut user, later));
        assert_eq!(user.plan, Plan::Community);
        assert_eq!(user.subscription.status, SubscriptionStatus::Inactive);
        assert_eq!(user.usage.messages_limit, 50);
        assert_eq!(user.usage.messages_used, 50);
        assert!(user.subscription.current_period_start.is_none());
        assert!(user.subscription.current_period_end.is_none());
        assert_eq!(
            user.usage.reset_date,
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
        );
        let last = user.transactions.last().unwrap();
        assert_eq!(last.kind, TransactionKind::Downgrade);
        assert_eq!(last.metadata.get("reason").map(String::as_str), Some("expired"));
    }

    #[test]
    fn force_expire_keeps_usage_below_the_community_limit() {
        let mut user = paid_user(Plan::Developer);
        user.usage.messages_used = 12;
        force_expire(&mut user, now() + Duration::days(40));
        assert_eq!(user.usage.messages_used, 12);
    }

    #[test]
    fn force_expire_is_idempotent() {
        let mut once = paid_user(Plan::Max);
        once.usage.messages_used = 80;
        let later = now() + Duration::days(40);
        force_expire(&mut once, later);

        let mut twice = once.clone();
        assert!(!force_expire(&mut twice, later));
        assert_eq!(twice, once);
    }

    #[test]
    fn lapsed_check_uses_inclusive_period_end() {
        let user = paid_user(Plan::Pro);
        let end = user.subscription.current_period_end.unwrap();
        assert!(!is_lapsed(&user, end - Duration::seconds(1)));
        assert!(is_lapsed(&user, end));
        assert!(!is_lapsed(&community_user(), end));
    }
}

//! Append-only audit records: transactions and invoices.

use super::plan::Plan;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Subscription,
    Upgrade,
    Downgrade,
    Cancellation,
    Reactivation,
    Recharge,
}

impl TransactionKind {
    /// Classifies a plan change by tier movement.
    pub fn for_plan_change(from: Plan, to: Plan) -> Self {
        if from.is_community() {
            TransactionKind::Subscription
        } else if to.rank() > from.rank() {
            TransactionKind::Upgrade
        } else {
            TransactionKind::Downgrade
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Completed,
    Pending,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_plan: Option<Plan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_plan: Option<Plan>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub status: TransactionStatus,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl TransactionRecord {
    pub fn new(kind: TransactionKind, description: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("txn_{}", uuid::Uuid::new_v4().simple()),
            kind,
            description: description.into(),
            amount: Decimal::ZERO,
            from_plan: None,
            to_plan: None,
            date: now,
            status: TransactionStatus::Completed,
            metadata: HashMap::new(),
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_plans(mut self, from: Plan, to: Plan) -> Self {
        self.from_plan = Some(from);
        self.to_plan = Some(to);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Paid,
    Pending,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub items: Vec<InvoiceItem>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
}

impl Invoice {
    /// A single-line invoice settled at issue time.
    pub fn paid(item: InvoiceItem, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("inv_{}", uuid::Uuid::new_v4().simple()),
            date: now,
            amount: item.amount,
            status: InvoiceStatus::Paid,
            items: vec![item],
            due_date: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_changes_are_classified_by_tier() {
        assert_eq!(
            TransactionKind::for_plan_change(Plan::Community, Plan::Pro),
            TransactionKind::Subscription
        );
        assert_eq!(
            TransactionKind::for_plan_change(Plan::Developer, Plan::Max),
            TransactionKind::Upgrade
        );
        assert_eq!(
            TransactionKind::for_plan_change(Plan::Max, Plan::Developer),
            TransactionKind::Downgrade
        );
        assert_eq!(
            TransactionKind::for_plan_change(Plan::Pro, Plan::Community),
            TransactionKind::Downgrade
        );
    }

    #[test]
    fn transaction_kind_serializes_under_type_key() {
        let txn = TransactionRecord::new(TransactionKind::Recharge, "Recharge", Utc::now());
        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["type"], "recharge");
        assert_eq!(json["status"], "completed");
    }
}

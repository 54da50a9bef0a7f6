use crate::models::{
    Invoice, InvoiceItem, InvoiceStatus, Plan, TransactionKind, TransactionRecord,
    TransactionStatus,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub from_plan: Option<Plan>,
    pub to_plan: Option<Plan>,
    pub date: DateTime<Utc>,
    pub status: TransactionStatus,
    pub metadata: HashMap<String, String>,
}

impl From<&TransactionRecord> for TransactionResponse {
    fn from(txn: &TransactionRecord) -> Self {
        TransactionResponse {
            id: txn.id.clone(),
            kind: txn.kind,
            description: txn.description.clone(),
            amount: txn.amount,
            from_plan: txn.from_plan,
            to_plan: txn.to_plan,
            date: txn.date,
            status: txn.status,
            metadata: txn.metadata.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemResponse {
    pub description: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl From<&InvoiceItem> for InvoiceItemResponse {
    fn from(item: &InvoiceItem) -> Self {
        InvoiceItemResponse {
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            amount: item.amount,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: String,
    pub date: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub items: Vec<InvoiceItemResponse>,
    pub due_date: DateTime<Utc>,
}

impl From<&Invoice> for InvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        InvoiceResponse {
            id: invoice.id.clone(),
            date: invoice.date,
            amount: invoice.amount,
            status: invoice.status,
            items: invoice.items.iter().map(InvoiceItemResponse::from).collect(),
            due_date: invoice.due_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn money_is_serialized_as_json_numbers() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let invoice = Invoice::paid(
            InvoiceItem {
                description: "Message recharge (25 messages)".to_string(),
                quantity: 25,
                unit_price: Decimal::from(3),
                amount: Decimal::from(75),
            },
            now,
        );

        let json = serde_json::to_value(InvoiceResponse::from(&invoice)).unwrap();

        assert_eq!(json["amount"], serde_json::json!(75.0));
        assert_eq!(json["items"][0]["unitPrice"], serde_json::json!(3.0));
        assert_eq!(json["status"], "paid");
    }
}

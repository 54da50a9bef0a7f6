use crate::models::{RechargeEntry, TransactionStatus, User};
use crate::services::EntitlementSnapshot;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ConsumeRequest {
    #[validate(range(min = 1, max = 1000, message = "Count must be between 1 and 1000"))]
    pub count: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeResponse {
    pub consumed: u32,
    pub source: &'static str,
    #[serde(flatten)]
    pub usage: EntitlementSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub messages: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub messages: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
    pub base_pack: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_message: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeRequest {
    pub messages: u32,
    /// Reference of an already settled payment.
    pub payment_ref: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeEntryResponse {
    pub amount: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub date: DateTime<Utc>,
    pub transaction_id: String,
    pub status: TransactionStatus,
}

impl From<&RechargeEntry> for RechargeEntryResponse {
    fn from(entry: &RechargeEntry) -> Self {
        RechargeEntryResponse {
            amount: entry.amount,
            price: entry.price,
            date: entry.date,
            transaction_id: entry.transaction_id.clone(),
            status: entry.status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeHistoryResponse {
    pub balance: u32,
    pub total_purchased: u32,
    pub last_recharge_date: Option<DateTime<Utc>>,
    /// Newest first.
    pub history: Vec<RechargeEntryResponse>,
}

impl From<&User> for RechargeHistoryResponse {
    fn from(user: &User) -> Self {
        RechargeHistoryResponse {
            balance: user.recharge.balance,
            total_purchased: user.recharge.total_purchased,
            last_recharge_date: user.recharge.last_recharge_date,
            history: user
                .recharge
                .recharge_history
                .iter()
                .rev()
                .map(RechargeEntryResponse::from)
                .collect(),
        }
    }
}

use super::bson_dates::opt_chrono_datetime_as_bson_datetime;
use super::billing::TransactionStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Supplemental message pool, independent of the plan period.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Recharge {
    pub balance: u32,
    pub total_purchased: u32,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub last_recharge_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recharge_history: Vec<RechargeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RechargeEntry {
    pub amount: u32,
    pub price: Decimal,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub transaction_id: String,
    pub status: TransactionStatus,
}

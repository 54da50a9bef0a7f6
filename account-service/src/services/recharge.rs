//! Recharge balance: purchased message packs that back up the plan quota.

use super::error::AccountError;
use crate::models::{
    Invoice, InvoiceItem, RechargeEntry, TransactionKind, TransactionRecord, TransactionStatus,
    User,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Base-pack pricing: `base_price` covers up to `base_pack` messages, each
/// message above that costs `price_per_message`.
#[derive(Debug, Clone, PartialEq)]
pub struct RechargePricing {
    pub base_price: Decimal,
    pub base_pack: u32,
    pub price_per_message: Decimal,
    pub min_messages: u32,
    pub max_messages: u32,
}

impl Default for RechargePricing {
    fn default() -> Self {
        Self {
            base_price: Decimal::from(30),
            base_pack: 10,
            price_per_message: Decimal::from(3),
            min_messages: 10,
            max_messages: 1000,
        }
    }
}

impl RechargePricing {
    pub fn quote_for_messages(&self, count: u32) -> Result<Decimal, AccountError> {
        if count < self.min_messages || count > self.max_messages {
            return Err(AccountError::Validation(format!(
                "Recharge must be between {} and {} messages",
                self.min_messages, self.max_messages
            )));
        }

        if count <= self.base_pack {
            Ok(self.base_price)
        } else {
            let extra = Decimal::from(count - self.base_pack);
            Ok(self.base_price + extra * self.price_per_message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeReceipt {
    pub transaction_id: String,
    pub messages: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub new_balance: u32,
    pub total_purchased: u32,
}

/// Credits `count` messages. Payment is assumed settled under `payment_ref`,
/// so this only fails on validation.
pub fn purchase(
    user: &mut User,
    pricing: &RechargePricing,
    count: u32,
    payment_ref: &str,
    now: DateTime<Utc>,
) -> Result<RechargeReceipt, AccountError> {
    let total_price = pricing.quote_for_messages(count)?;

    let transaction = TransactionRecord::new(
        TransactionKind::Recharge,
        format!("Recharge of {} messages", count),
        now,
    )
    .with_amount(total_price)
    .with_metadata("payment_ref", payment_ref)
    .with_metadata("messages", count.to_string());
    let transaction_id = transaction.id.clone();

    let recharge = &mut user.recharge;
    recharge.balance = recharge.balance.saturating_add(count);
    recharge.total_purchased = recharge.total_purchased.saturating_add(count);
    recharge.last_recharge_date = Some(now);
    recharge.recharge_history.push(RechargeEntry {
        amount: count,
        price: total_price,
        date: now,
        transaction_id: transaction_id.clone(),
        status: TransactionStatus::Completed,
    });

    user.transactions.push(transaction);
    user.invoices.push(Invoice::paid(
        InvoiceItem {
            description: format!("Message recharge ({} messages)", count),
            quantity: count,
            unit_price: total_price / Decimal::from(count),
            amount: total_price,
        },
        now,
    ));

    tracing::info!(
        user_id = %user.id,
        messages = count,
        total_price = %total_price,
        balance = user.recharge.balance,
        "Recharge purchased"
    );

    Ok(RechargeReceipt {
        transaction_id,
        messages: count,
        total_price,
        new_balance: user.recharge.balance,
        total_purchased: user.recharge.total_purchased,
    })
}

/// Draws `count` messages from the recharge pool.
pub fn consume(user: &mut User, count: u32) -> Result<(), AccountError> {
    if user.recharge.balance < count {
        return Err(AccountError::InsufficientBalance {
            requested: count,
            available: user.recharge.balance,
        });
    }
    user.recharge.balance -= count;
    Ok(())
}

pub mod billing;
pub mod bson_dates;
pub mod plan;
pub mod recharge;
pub mod subscription;
pub mod usage;
pub mod user;

pub use billing::{
    Invoice, InvoiceItem, InvoiceStatus, TransactionKind, TransactionRecord, TransactionStatus,
};
pub use plan::{BillingCycle, Plan};
pub use recharge::{Recharge, RechargeEntry};
pub use subscription::{Subscription, SubscriptionStatus, SubscriptionView};
pub use usage::{first_of_next_month, DailyUsage, Usage};
pub use user::{NewUser, Role, User};

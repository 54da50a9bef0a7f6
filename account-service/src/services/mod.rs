pub mod account;
pub mod catalog;
pub mod database;
pub mod entitlement;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod notifier;
pub mod recharge;
pub mod store;
pub mod subscription;
pub mod sweeper;

pub use account::AccountService;
pub use database::MongoUserStore;
pub use entitlement::{Capacity, EntitlementSnapshot, Pool};
pub use error::AccountError;
pub use metrics::{get_metrics, init_metrics};
pub use notifier::{AccountNotifier, HttpNotificationClient, LogNotifier, MockNotifier};
pub use recharge::RechargePricing;
pub use store::{InMemoryUserStore, StoreError, UserStore};
pub use sweeper::{ExpirySweeper, SweepReport};

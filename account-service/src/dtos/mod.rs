pub mod account;
pub mod billing;
pub mod subscription;
pub mod usage;

pub use account::{AccountResponse, CreateAccountRequest, FeatureAccessResponse};
pub use billing::{InvoiceResponse, TransactionResponse};
pub use subscription::{
    CancelRequest, CancelResponse, ChangePlanRequest, ContactSalesResponse, PlanChangeResponse,
};
pub use usage::{
    ConsumeRequest, ConsumeResponse, HistoryQuery, QuoteQuery, QuoteResponse, RechargeHistoryResponse,
    RechargeRequest,
};

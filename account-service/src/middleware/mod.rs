pub mod account;

pub use account::{account_middleware, require_admin, CurrentUser, USER_ID_HEADER};

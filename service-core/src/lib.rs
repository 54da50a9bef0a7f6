//! Shared infrastructure for the account platform services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

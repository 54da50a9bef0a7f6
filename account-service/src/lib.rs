pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use services::{AccountService, ExpirySweeper};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub sweeper: ExpirySweeper,
    pub sales_contact_email: String,
}

impl AppState {
    pub fn new(accounts: AccountService, sales_contact_email: impl Into<String>) -> Self {
        Self {
            sweeper: ExpirySweeper::new(accounts.clone()),
            accounts,
            sales_contact_email: sales_contact_email.into(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/admin/subscriptions/expire",
            post(handlers::admin::expire_subscriptions),
        )
        .layer(from_fn(middleware::require_admin));

    // Everything below runs with the refreshed account in request extensions.
    let account_routes = Router::new()
        .route(
            "/accounts/me",
            get(handlers::accounts::get_me).delete(handlers::accounts::delete_me),
        )
        .route(
            "/features/:feature",
            get(handlers::accounts::check_feature),
        )
        .route("/usage", get(handlers::usage::get_usage))
        .route("/usage/consume", post(handlers::usage::consume))
        .route("/usage/history", get(handlers::usage::usage_history))
        .route("/recharge/quote", get(handlers::recharge::quote))
        .route("/recharge", post(handlers::recharge::purchase))
        .route("/recharge/history", get(handlers::recharge::history))
        .route(
            "/subscription",
            get(handlers::subscription::get_subscription),
        )
        .route(
            "/subscription/change",
            post(handlers::subscription::change_plan),
        )
        .route("/subscription/cancel", post(handlers::subscription::cancel))
        .route(
            "/subscription/reactivate",
            post(handlers::subscription::reactivate),
        )
        .route(
            "/billing/transactions",
            get(handlers::billing::list_transactions),
        )
        .route("/billing/invoices", get(handlers::billing::list_invoices))
        .route(
            "/billing/invoices/:id",
            get(handlers::billing::get_invoice),
        )
        .merge(admin_routes)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::account_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .route("/plans", get(handlers::plans::list_plans))
        .route("/accounts", post(handlers::accounts::create_account))
        .merge(account_routes)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(from_fn(request_id_middleware))
}

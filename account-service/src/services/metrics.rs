//! Metrics collection for account-service.
//!
//! Domain counters live in a dedicated Prometheus registry; HTTP metrics come
//! from the `metrics` recorder installed alongside it.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static CONSUMPTION_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static QUOTA_EXCEEDED_TOTAL: OnceLock<IntCounter> = OnceLock::new();
pub static SUBSCRIPTION_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static RECHARGE_PURCHASES_TOTAL: OnceLock<IntCounter> = OnceLock::new();
pub static EXPIRY_SWEEPS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize metrics collection. Call once at startup.
pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    let registry = Registry::new();

    let consumption = IntCounterVec::new(
        Opts::new(
            "account_consumption_total",
            "Messages consumed, by the pool they were charged to",
        ),
        &["pool"],
    )
    .expect("Failed to create account_consumption_total metric");

    let quota_exceeded = IntCounter::new(
        "account_quota_exceeded_total",
        "Consumption requests rejected for lack of capacity",
    )
    .expect("Failed to create account_quota_exceeded_total metric");

    let subscription_ops = IntCounterVec::new(
        Opts::new(
            "account_subscription_operations_total",
            "Subscription state transitions by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create account_subscription_operations_total metric");

    let recharges = IntCounter::new(
        "account_recharge_purchases_total",
        "Completed recharge purchases",
    )
    .expect("Failed to create account_recharge_purchases_total metric");

    let sweeps = IntCounterVec::new(
        Opts::new(
            "account_expiry_sweeps_total",
            "Users processed by the expiry sweeper, by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create account_expiry_sweeps_total metric");

    registry
        .register(Box::new(consumption.clone()))
        .expect("Failed to register account_consumption_total");
    registry
        .register(Box::new(quota_exceeded.clone()))
        .expect("Failed to register account_quota_exceeded_total");
    registry
        .register(Box::new(subscription_ops.clone()))
        .expect("Failed to register account_subscription_operations_total");
    registry
        .register(Box::new(recharges.clone()))
        .expect("Failed to register account_recharge_purchases_total");
    registry
        .register(Box::new(sweeps.clone()))
        .expect("Failed to register account_expiry_sweeps_total");

    PROMETHEUS_REGISTRY
        .set(registry)
        .expect("Failed to set prometheus registry");
    CONSUMPTION_TOTAL
        .set(consumption)
        .expect("Failed to set account_consumption_total");
    QUOTA_EXCEEDED_TOTAL
        .set(quota_exceeded)
        .expect("Failed to set account_quota_exceeded_total");
    SUBSCRIPTION_OPERATIONS_TOTAL
        .set(subscription_ops)
        .expect("Failed to set account_subscription_operations_total");
    RECHARGE_PURCHASES_TOTAL
        .set(recharges)
        .expect("Failed to set account_recharge_purchases_total");
    EXPIRY_SWEEPS_TOTAL
        .set(sweeps)
        .expect("Failed to set account_expiry_sweeps_total");
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&registry.gather(), &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

pub fn record_consumption(pool: &str, count: u32) {
    if let Some(counter) = CONSUMPTION_TOTAL.get() {
        counter.with_label_values(&[pool]).inc_by(u64::from(count));
    }
}

pub fn record_quota_exceeded() {
    if let Some(counter) = QUOTA_EXCEEDED_TOTAL.get() {
        counter.inc();
    }
}

pub fn record_subscription_operation(operation: &str) {
    if let Some(counter) = SUBSCRIPTION_OPERATIONS_TOTAL.get() {
        counter.with_label_values(&[operation]).inc();
    }
}

pub fn record_recharge_purchase() {
    if let Some(counter) = RECHARGE_PURCHASES_TOTAL.get() {
        counter.inc();
    }
}

pub fn record_expiry_sweep(outcome: &str) {
    if let Some(counter) = EXPIRY_SWEEPS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

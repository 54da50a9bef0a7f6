//! Expiry sweeper, batch mode. The per-request mode runs through
//! `AccountService::current` on every authenticated request.

use super::account::AccountService;
use super::error::AccountError;
use super::metrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub scanned: usize,
    pub processed: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ExpirySweeper {
    accounts: AccountService,
}

impl ExpirySweeper {
    pub fn new(accounts: AccountService) -> Self {
        Self { accounts }
    }

    /// Expires every lapsed paid subscription. Per-user failures are counted
    /// and logged; they never stop the batch.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<SweepReport, AccountError> {
        let ids = self.accounts.store().find_expired_ids(now).await?;
        let mut report = SweepReport {
            scanned: ids.len(),
            ..Default::default()
        };

        for user_id in &ids {
            match self.accounts.refresh_account(user_id, now).await {
                Ok(refresh) if refresh.expired => {
                    report.processed += 1;
                    metrics::record_expiry_sweep("expired");
                }
                Ok(_) => metrics::record_expiry_sweep("skipped"),
                Err(e) => {
                    report.failed += 1;
                    metrics::record_expiry_sweep("failed");
                    tracing::error!(user_id = %user_id, error = %e, "Failed to expire subscription");
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            processed = report.processed,
            failed = report.failed,
            "Expiry sweep finished"
        );
        Ok(report)
    }

    /// Runs the sweep on a fixed interval until the task is aborted.
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once(Utc::now()).await {
                    tracing::error!(error = %e, "Expiry sweep failed");
                }
            }
        })
    }
}

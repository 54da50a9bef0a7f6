//! Application assembly: store, notifier, sweeper and HTTP listener.

use crate::config::AccountConfig;
use crate::services::{
    AccountNotifier, AccountService, HttpNotificationClient, LogNotifier, MongoUserStore,
    UserStore,
};
use crate::{build_router, AppState};
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
    sweep_interval: Option<Duration>,
}

fn build_notifier(config: &AccountConfig) -> Arc<dyn AccountNotifier> {
    match config.notifications.service_url.as_deref() {
        Some(url) => match HttpNotificationClient::new(url) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::warn!("Failed to build notification client: {}. Logging only.", e);
                Arc::new(LogNotifier)
            }
        },
        None => {
            tracing::info!("NOTIFICATION_SERVICE_URL not set, notifications are logged only");
            Arc::new(LogNotifier)
        }
    }
}

impl Application {
    pub async fn build(config: AccountConfig) -> Result<Self, AppError> {
        let store = MongoUserStore::connect(&config.mongodb.uri, &config.mongodb.database).await?;

        store.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let store: Arc<dyn UserStore> = Arc::new(store);
        let accounts = AccountService::new(store, build_notifier(&config), config.recharge_pricing());
        let state = AppState::new(accounts, config.sales_contact_email.clone());

        // Port 0 binds a random port for tests.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        let sweep_interval = match config.expiry_sweep_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        tracing::info!(port, "Account service listening");

        Ok(Self {
            port,
            listener,
            state,
            sweep_interval,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        let interval = self.sweep_interval?;
        tracing::info!(
            interval_secs = interval.as_secs(),
            "Starting background expiry sweeper"
        );
        Some(self.state.sweeper.clone().spawn(interval))
    }

    /// Serves until `shutdown` resolves, then stops the background sweeper.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let sweeper = self.spawn_sweeper();
        let router = build_router(self.state);

        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        if let Some(handle) = sweeper {
            handle.abort();
        }

        result.map_err(|e| {
            tracing::error!("HTTP server error: {}", e);
            e
        })
    }
}

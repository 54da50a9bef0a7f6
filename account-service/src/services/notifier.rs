//! Notification collaborator. Sends are fire-and-forget from the caller's
//! point of view: failures are reported here and logged by the caller.

use super::subscription::{Cancellation, PlanChange};
use crate::models::{Plan, User};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notifier not enabled: {0}")]
    NotEnabled(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Notification service returned {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccountEvent {
    PlanChanged(PlanChange),
    Cancelled(Cancellation),
    Downgraded { previous_plan: Plan },
}

impl AccountEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AccountEvent::PlanChanged(_) => "plan_changed",
            AccountEvent::Cancelled(_) => "subscription_cancelled",
            AccountEvent::Downgraded { .. } => "subscription_expired",
        }
    }

    pub fn subject(&self) -> String {
        match self {
            AccountEvent::PlanChanged(change) => {
                format!("Your plan is now {}", change.plan)
            }
            AccountEvent::Cancelled(_) => "Your subscription has been cancelled".to_string(),
            AccountEvent::Downgraded { .. } => "Your subscription has expired".to_string(),
        }
    }

    pub fn body_text(&self, name: &str) -> String {
        match self {
            AccountEvent::PlanChanged(change) => {
                let billing = match change.next_billing_date {
                    Some(date) => format!(" Your next billing date is {}.", date.format("%Y-%m-%d")),
                    None => String::new(),
                };
                format!(
                    "Hi {}, your plan changed from {} to {}.{}",
                    name, change.previous_plan, change.plan, billing
                )
            }
            AccountEvent::Cancelled(cancellation) => match cancellation.access_until {
                Some(until) => format!(
                    "Hi {}, your {} plan will not renew. You keep access until {}.",
                    name,
                    cancellation.plan,
                    until.format("%Y-%m-%d")
                ),
                None => format!("Hi {}, your {} plan will not renew.", name, cancellation.plan),
            },
            AccountEvent::Downgraded { previous_plan } => format!(
                "Hi {}, your {} subscription period ended and your account moved to the community plan.",
                name, previous_plan
            ),
        }
    }
}

#[async_trait]
pub trait AccountNotifier: Send + Sync {
    async fn deliver(&self, user: &User, event: &AccountEvent) -> Result<(), NotifyError>;

    async fn notify_plan_changed(&self, user: &User, change: &PlanChange) -> Result<(), NotifyError> {
        self.deliver(user, &AccountEvent::PlanChanged(change.clone()))
            .await
    }

    async fn notify_cancelled(
        &self,
        user: &User,
        cancellation: &Cancellation,
    ) -> Result<(), NotifyError> {
        self.deliver(user, &AccountEvent::Cancelled(cancellation.clone()))
            .await
    }

    async fn notify_downgraded(&self, user: &User, previous_plan: Plan) -> Result<(), NotifyError> {
        self.deliver(user, &AccountEvent::Downgraded { previous_plan })
            .await
    }
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    to: &'a str,
    subject: String,
    body_text: String,
    body_html: String,
    metadata: HashMap<String, String>,
}

/// Posts emails to the notification service's HTTP API.
#[derive(Clone)]
pub struct HttpNotificationClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotificationClient {
    pub fn new(base_url: &str) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        let endpoint = format!("{}/notifications/email", base_url.trim_end_matches('/'));
        tracing::info!(endpoint = %endpoint, "Notification HTTP client configured");
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl AccountNotifier for HttpNotificationClient {
    #[tracing::instrument(skip(self, user, event), fields(user_id = %user.id, event = event.kind()))]
    async fn deliver(&self, user: &User, event: &AccountEvent) -> Result<(), NotifyError> {
        let Some(to) = user.email.as_deref() else {
            tracing::debug!("User has no email address, skipping notification");
            return Ok(());
        };

        let body_text = event.body_text(&user.name);
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), "account-service".to_string());
        metadata.insert("event".to_string(), event.kind().to_string());
        metadata.insert("user_id".to_string(), user.id.clone());

        let request = EmailRequest {
            to,
            subject: event.subject(),
            body_html: format!(
                "<html><body style=\"font-family: Arial, sans-serif;\"><p>{}</p></body></html>",
                body_text
            ),
            body_text,
            metadata,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        tracing::info!("Account notification queued");
        Ok(())
    }
}

/// Used when no notification service is configured.
pub struct LogNotifier;

#[async_trait]
impl AccountNotifier for LogNotifier {
    async fn deliver(&self, user: &User, event: &AccountEvent) -> Result<(), NotifyError> {
        tracing::info!(
            user_id = %user.id,
            event = event.kind(),
            subject = %event.subject(),
            "[LOG] Account notification would be sent"
        );
        Ok(())
    }
}

/// Records delivered events in memory, for testing.
pub struct MockNotifier {
    enabled: bool,
    events: Mutex<Vec<(String, AccountEvent)>>,
}

impl MockNotifier {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: Mutex::new(Vec::new()),
        }
    }

    /// `(user_id, event)` pairs in delivery order.
    pub fn events(&self) -> Vec<(String, AccountEvent)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AccountNotifier for MockNotifier {
    async fn deliver(&self, user: &User, event: &AccountEvent) -> Result<(), NotifyError> {
        if !self.enabled {
            return Err(NotifyError::NotEnabled(
                "Mock notifier is not enabled".to_string(),
            ));
        }
        if let Ok(mut events) = self.events.lock() {
            events.push((user.id.clone(), event.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn mock_notifier_records_events() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let user = User::community(NewUser::default(), 50, now);
        let notifier = MockNotifier::new(true);

        notifier.notify_downgraded(&user, Plan::Pro).await.unwrap();

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, user.id);
        assert_eq!(
            events[0].1,
            AccountEvent::Downgraded {
                previous_plan: Plan::Pro
            }
        );
    }

    #[tokio::test]
    async fn disabled_mock_notifier_fails() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let user = User::community(NewUser::default(), 50, now);
        let notifier = MockNotifier::new(false);
        assert!(notifier.notify_downgraded(&user, Plan::Pro).await.is_err());
    }

    #[test]
    fn downgrade_body_names_previous_plan() {
        let event = AccountEvent::Downgraded {
            previous_plan: Plan::Max,
        };
        assert!(event.body_text("Ada").contains("max subscription period ended"));
    }
}

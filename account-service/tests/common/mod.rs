#![allow(dead_code)]

use account_service::models::User;
use account_service::services::{
    AccountService, InMemoryUserStore, MockNotifier, RechargePricing, UserStore,
};
use account_service::{build_router, AppState};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const SALES_CONTACT: &str = "sales@test.local";

/// Router over an in-memory store with a recording notifier.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryUserStore>,
    pub notifier: Arc<MockNotifier>,
    pub accounts: AccountService,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryUserStore::new());
        let notifier = Arc::new(MockNotifier::new(true));
        let accounts = AccountService::new(
            store.clone(),
            notifier.clone(),
            RechargePricing::default(),
        );
        let router = build_router(AppState::new(accounts.clone(), SALES_CONTACT));

        Self {
            router,
            store,
            notifier,
            accounts,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = user_id {
            builder = builder.header("x-user-id", id);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user_id: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(user_id), None).await
    }

    pub async fn post(&self, uri: &str, user_id: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(user_id), Some(body)).await
    }

    /// Provisions an account through the API and returns its id.
    pub async fn create_user(&self, email: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/accounts",
                None,
                Some(serde_json::json!({ "name": "Test User", "email": email })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "provisioning failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn load(&self, user_id: &str) -> User {
        self.store.load(user_id).await.unwrap().unwrap()
    }

    /// Applies `edit` to the stored user, bypassing the engine.
    pub async fn edit<F: FnOnce(&mut User)>(&self, user_id: &str, edit: F) {
        let mut user = self.load(user_id).await;
        edit(&mut user);
        self.store.save(&mut user).await.unwrap();
    }
}

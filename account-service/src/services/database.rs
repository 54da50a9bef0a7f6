use super::store::{StoreError, UserStore};
use crate::models::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc},
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoUserStore {
    client: MongoClient,
    db: Database,
}

impl MongoUserStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for account-service");

        // OAuth-only accounts have no email, OAuth ids are optional too
        for field in ["email", "google_id", "github_id"] {
            let index = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(
                    IndexOptions::builder()
                        .name(format!("{}_unique_idx", field))
                        .unique(true)
                        .sparse(true)
                        .build(),
                )
                .build();

            self.users().create_index(index, None).await.map_err(|e| {
                tracing::error!("Failed to create {} index: {}", field, e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        }

        let expiry_index = IndexModel::builder()
            .keys(doc! { "subscription.status": 1, "subscription.current_period_end": 1 })
            .options(
                IndexOptions::builder()
                    .name("subscription_expiry_idx".to_string())
                    .build(),
            )
            .build();

        self.users()
            .create_index(expiry_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create subscription expiry index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY
    )
}

fn duplicate_field(err: &mongodb::error::Error) -> String {
    let message = err.to_string();
    ["google_id", "github_id", "email"]
        .into_iter()
        .find(|field| message.contains(field))
        .unwrap_or("identity")
        .to_string()
}

#[async_trait]
impl UserStore for MongoUserStore {
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        self.users().insert_one(user, None).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::Duplicate(duplicate_field(&e))
            } else {
                tracing::error!("Failed to insert user: {}", e);
                StoreError::Database(e)
            }
        })?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn load(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "_id": user_id }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load user: {}", e);
                StoreError::Database(e)
            })
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id, version = user.version))]
    async fn save(&self, user: &mut User) -> Result<(), StoreError> {
        let expected = user.version;
        let mut next = user.clone();
        next.version = expected + 1;

        let result = self
            .users()
            .replace_one(doc! { "_id": &user.id, "version": expected }, &next, None)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::Duplicate(duplicate_field(&e))
                } else {
                    tracing::error!("Failed to save user: {}", e);
                    StoreError::Database(e)
                }
            })?;

        if result.matched_count == 0 {
            return Err(StoreError::VersionConflict);
        }

        user.version = next.version;
        Ok(())
    }

    #[tracing::instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "email": email.trim().to_lowercase() }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to find user by email: {}", e);
                StoreError::Database(e)
            })
    }

    #[tracing::instrument(skip(self))]
    async fn find_expired_ids(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let filter = doc! {
            "plan": { "$ne": "community" },
            "subscription.status": "active",
            "subscription.current_period_end": { "$lt": bson::DateTime::from_chrono(now) },
        };
        let options = FindOptions::builder()
            .projection(doc! { "_id": 1 })
            .build();

        let mut cursor = self
            .db
            .collection::<bson::Document>("users")
            .find(filter, options)
            .await?;

        let mut ids = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            if let Ok(id) = document.get_str("_id") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                StoreError::Database(e)
            })?;
        Ok(())
    }
}

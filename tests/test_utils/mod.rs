//! Test utilities for database and application testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations applied, seeded tenants, and fully wired application
//! state with a recording job queue.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use shoplytics::auth::SessionStore;
use shoplytics::config::{AppConfig, BackfillConfig};
use shoplytics::jobs::{JobId, JobQueue, SyncJob};
use shoplytics::models::{tenant, user};
use shoplytics::repositories::{TenantRepository, UserRepository};
use shoplytics::server::AppState;
use shoplytics::shopify::ShopifyClient;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;

    Migrator::up(&db, None).await?;

    // SQLite does not enforce our Postgres foreign key semantics; disable FK
    // checks so fixtures can be inserted without full relation graphs.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await?;

    Ok(db)
}

/// Configuration used across the integration tests: test profile, fixed
/// app credentials, a zeroed crypto key, and an unthrottled backfill.
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        shopify_api_key: Some("test-api-key".to_string()),
        shopify_api_secret: Some("test-api-secret".to_string()),
        crypto_key: Some(vec![0u8; 32]),
        frontend_url: "http://frontend.test".to_string(),
        base_url: "http://app.test".to_string(),
        backfill: BackfillConfig {
            page_limit: 2,
            page_delay_ms: 0,
        },
        ..Default::default()
    }
}

/// Job queue that records submissions instead of running them.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingJobQueue {
    pub submitted: Mutex<Vec<SyncJob>>,
}

impl RecordingJobQueue {
    #[allow(dead_code)]
    pub fn jobs(&self) -> Vec<SyncJob> {
        self.submitted.lock().unwrap().clone()
    }
}

impl JobQueue for RecordingJobQueue {
    fn submit(&self, job: SyncJob) -> JobId {
        self.submitted.lock().unwrap().push(job);
        JobId(Uuid::new_v4())
    }
}

/// Seed a user and its tenant with a plaintext fixture token.
#[allow(dead_code)]
pub async fn create_test_tenant(
    db: &DatabaseConnection,
    shop_domain: &str,
) -> Result<(user::Model, tenant::Model)> {
    let (user, _) = UserRepository::new(db)
        .get_or_create(
            &format!("owner@{}", shop_domain),
            Some("Test".to_string()),
            Some("Owner".to_string()),
            "!unusable".to_string(),
        )
        .await?;

    let name = shop_domain.split('.').next().unwrap_or(shop_domain);
    let tenant = TenantRepository::new(db)
        .upsert_by_domain(shop_domain, user.id, name, b"test-token".to_vec())
        .await?;

    Ok((user, tenant))
}

/// Fully wired application state plus handles the tests assert against.
#[allow(dead_code)]
pub struct TestApp {
    pub state: AppState,
    pub jobs: Arc<RecordingJobQueue>,
}

/// Build application state over a fresh database. `shop_base` points the
/// Shopify client at a mock server when given.
#[allow(dead_code)]
pub async fn setup_test_app(shop_base: Option<String>) -> Result<TestApp> {
    let db = setup_test_db().await?;
    let config = Arc::new(test_config());

    let mut shopify = ShopifyClient::new(&config);
    if let Some(base) = shop_base {
        shopify = shopify.with_shop_base(base);
    }

    let jobs = Arc::new(RecordingJobQueue::default());
    let state = AppState {
        config: Arc::clone(&config),
        db,
        shopify,
        jobs: Arc::clone(&jobs) as Arc<dyn JobQueue>,
        sessions: Arc::new(SessionStore::new(Duration::from_secs(3600))),
    };

    Ok(TestApp { state, jobs })
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// Collect a response body as text.
#[allow(dead_code)]
pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    String::from_utf8(bytes.to_vec()).expect("body is UTF-8")
}

//! Background job queue boundary.
//!
//! Long-running sync work is handed off as fire-and-forget submissions
//! identified only by tenant id: the caller gets a job id back and nothing
//! else — no completion tracking, no retries, no result delivery. Failures
//! are logged by the runner and never surfaced to the submitting request,
//! which has usually already returned by the time the job runs.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::crypto;
use crate::models::tenant::Model as TenantModel;
use crate::repositories::TenantRepository;
use crate::shopify::ShopifyClient;
use crate::sync::{BackfillEngine, WebhookSubscriber};

/// Identifier returned by a submission; purely informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobId(pub Uuid);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The sync jobs the OAuth callback schedules, keyed only by tenant id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncJob {
    /// Register the webhook topic set for a tenant
    SubscribeWebhooks { tenant_id: Uuid },
    /// One-time historical import of a tenant's store data
    BackfillStore { tenant_id: Uuid },
}

impl SyncJob {
    pub fn name(&self) -> &'static str {
        match self {
            SyncJob::SubscribeWebhooks { .. } => "subscribe_webhooks",
            SyncJob::BackfillStore { .. } => "backfill_store",
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        match self {
            SyncJob::SubscribeWebhooks { tenant_id } | SyncJob::BackfillStore { tenant_id } => {
                *tenant_id
            }
        }
    }
}

/// Submit-and-return job queue seam.
///
/// The core never awaits results through this interface; at-most-once
/// submission is all it promises.
pub trait JobQueue: Send + Sync {
    fn submit(&self, job: SyncJob) -> JobId;
}

/// In-process queue backed by detached Tokio tasks.
pub struct TokioJobQueue {
    db: DatabaseConnection,
    config: Arc<AppConfig>,
    client: ShopifyClient,
}

impl TokioJobQueue {
    pub fn new(db: DatabaseConnection, config: Arc<AppConfig>, client: ShopifyClient) -> Self {
        Self { db, config, client }
    }
}

impl JobQueue for TokioJobQueue {
    fn submit(&self, job: SyncJob) -> JobId {
        let job_id = JobId(Uuid::new_v4());
        let db = self.db.clone();
        let config = Arc::clone(&self.config);
        let client = self.client.clone();

        info!(job = job.name(), %job_id, tenant_id = %job.tenant_id(), "Submitting sync job");

        tokio::spawn(async move {
            run_job(db, config, client, job, job_id).await;
        });

        job_id
    }
}

/// Execute one job. Errors end here: logged, counted, never propagated.
async fn run_job(
    db: DatabaseConnection,
    config: Arc<AppConfig>,
    client: ShopifyClient,
    job: SyncJob,
    job_id: JobId,
) {
    let tenant = match TenantRepository::new(&db).find_by_id(job.tenant_id()).await {
        Ok(Some(tenant)) => tenant,
        Ok(None) => {
            // Tenant deleted between submission and execution; nothing to do
            debug!(job = job.name(), %job_id, tenant_id = %job.tenant_id(), "Tenant vanished, dropping job");
            return;
        }
        Err(err) => {
            error!(job = job.name(), %job_id, error = %err, "Failed to resolve tenant for job");
            return;
        }
    };

    let access_token = match tenant_access_token(&config, &tenant) {
        Ok(token) => token,
        Err(err) => {
            error!(
                job = job.name(),
                %job_id,
                shop = %tenant.shopify_domain,
                error = %err,
                "Failed to recover tenant access token"
            );
            return;
        }
    };

    let result = match job {
        SyncJob::SubscribeWebhooks { .. } => {
            let subscriber = WebhookSubscriber::new(client, config.base_url.clone());
            subscriber
                .subscribe(&db, &tenant, &access_token)
                .await
                .map(|_| ())
        }
        SyncJob::BackfillStore { .. } => {
            let engine = BackfillEngine::new(client, config.backfill.clone());
            engine.sync(&db, &tenant, &access_token).await.map(|_| ())
        }
    };

    match result {
        Ok(()) => info!(job = job.name(), %job_id, shop = %tenant.shopify_domain, "Sync job completed"),
        Err(err) => error!(
            job = job.name(),
            %job_id,
            shop = %tenant.shopify_domain,
            error = %err,
            "Sync job failed"
        ),
    }
}

fn tenant_access_token(
    config: &AppConfig,
    tenant: &TenantModel,
) -> Result<String, crypto::CryptoError> {
    crypto::open_access_token(
        config.crypto_key.as_deref(),
        &tenant.shopify_domain,
        &tenant.access_token_ciphertext,
    )
}

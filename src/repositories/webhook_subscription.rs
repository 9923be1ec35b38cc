//! # Webhook Subscription Repository
//!
//! Audit rows keyed (tenant, topic); every (re)subscription attempt lands
//! in the same row with its latest status and raw response.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::webhook_subscription::{self, ActiveModel, Entity, Model};

/// Repository for WebhookSubscription database operations
pub struct WebhookSubscriptionRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> WebhookSubscriptionRepository<'a, C> {
    /// Create a new WebhookSubscriptionRepository with the given connection
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Find the audit row for one (tenant, topic)
    pub async fn find_by_topic(
        &self,
        tenant_id: Uuid,
        topic: &str,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(webhook_subscription::Column::TenantId.eq(tenant_id))
            .filter(webhook_subscription::Column::Topic.eq(topic))
            .one(self.db)
            .await
    }

    /// Upsert the registration outcome for one (tenant, topic).
    pub async fn upsert(
        &self,
        tenant_id: Uuid,
        topic: &str,
        address: &str,
        status: &str,
        last_response: Option<JsonValue>,
    ) -> Result<Model, sea_orm::DbErr> {
        let now = Utc::now();

        if let Some(existing) = self.find_by_topic(tenant_id, topic).await? {
            let mut active = existing.into_active_model();
            active.address = Set(address.to_string());
            active.status = Set(status.to_string());
            active.last_response = Set(last_response);
            active.updated_at = Set(now.into());
            return active.update(self.db).await;
        }

        let subscription = ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            topic: Set(topic.to_string()),
            address: Set(address.to_string()),
            status: Set(status.to_string()),
            last_response: Set(last_response),
            updated_at: Set(now.into()),
        };

        subscription.insert(self.db).await
    }

    /// List all audit rows for a tenant
    pub async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(webhook_subscription::Column::TenantId.eq(tenant_id))
            .all(self.db)
            .await
    }
}

//! # Custom Event Repository
//!
//! Append-only inserts; checkout events are never deduplicated.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::custom_event::{self, ActiveModel, Entity, Model};

/// Repository for CustomEvent database operations
pub struct CustomEventRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> CustomEventRepository<'a, C> {
    /// Create a new CustomEventRepository with the given connection
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Append one event with the inbound payload retained verbatim.
    pub async fn insert(
        &self,
        tenant_id: Uuid,
        event_type: &str,
        customer_id: Option<Uuid>,
        metadata: JsonValue,
    ) -> Result<Model, sea_orm::DbErr> {
        let event = ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            event_type: Set(event_type.to_string()),
            customer_id: Set(customer_id),
            metadata: Set(metadata),
            created_at: Set(Utc::now().into()),
        };

        event.insert(self.db).await
    }

    /// List events for a tenant
    pub async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(custom_event::Column::TenantId.eq(tenant_id))
            .all(self.db)
            .await
    }
}

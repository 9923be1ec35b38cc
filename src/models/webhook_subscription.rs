//! Webhook subscription entity model
//!
//! Audit row per (tenant, topic) recording the latest registration attempt
//! against Shopify, upserted on every (re)subscription pass.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "webhook_subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    /// Shopify topic, e.g. "orders/create"
    pub topic: String,

    /// Local ingest endpoint registered with Shopify
    pub address: String,

    /// "success", "http_error:{code}" or "error"
    pub status: String,

    /// Raw registration response body, or the exception text
    #[sea_orm(column_type = "JsonBinary")]
    pub last_response: Option<JsonValue>,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

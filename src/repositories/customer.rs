//! # Customer Repository
//!
//! Idempotent upserts keyed by (tenant_id, shopify_customer_id). Both the
//! backfill walk and the webhook handlers write through this repository, so
//! replaying the same external customer any number of times converges to a
//! single row.
//!
//! Two mapping shapes exist on purpose: full profiles (customer webhook,
//! customers backfill) carry address fields with default-address fallback;
//! embedded customers (order/checkout payloads) carry contact fields only.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::models::customer::{self, ActiveModel, Entity, Model};
use crate::shopify::types::ShopifyCustomer;

/// Flattened customer fields ready for an upsert.
#[derive(Debug, Clone)]
pub struct CustomerRecord {
    pub shopify_customer_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
    pub company: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Contact-only payloads must not clear address columns on update
    embedded: bool,
}

impl CustomerRecord {
    /// Full mapping: top-level contact fields win, the embedded default
    /// address fills the gaps (phone) and supplies the address columns.
    pub fn from_profile(payload: &ShopifyCustomer) -> Self {
        let address = payload.default_address.as_ref();
        Self {
            shopify_customer_id: payload.id,
            first_name: payload.first_name.clone(),
            last_name: payload.last_name.clone(),
            email: payload.email.clone(),
            phone: payload
                .phone
                .clone()
                .or_else(|| address.and_then(|a| a.phone.clone())),
            address1: address.and_then(|a| a.address1.clone()),
            address2: address.and_then(|a| a.address2.clone()),
            city: address.and_then(|a| a.city.clone()),
            province: address.and_then(|a| a.province.clone()),
            country: address.and_then(|a| a.country.clone()),
            zip: address.and_then(|a| a.zip.clone()),
            company: address.and_then(|a| a.company.clone()),
            created_at: payload.created_at,
            updated_at: payload.updated_at,
            embedded: false,
        }
    }

    /// Contact-only mapping for customers embedded in order and checkout
    /// payloads; address columns are left untouched on update.
    pub fn from_embedded(payload: &ShopifyCustomer) -> Self {
        Self {
            shopify_customer_id: payload.id,
            first_name: payload.first_name.clone(),
            last_name: payload.last_name.clone(),
            email: payload.email.clone(),
            phone: payload.phone.clone(),
            address1: None,
            address2: None,
            city: None,
            province: None,
            country: None,
            zip: None,
            company: None,
            created_at: payload.created_at,
            updated_at: payload.updated_at,
            embedded: true,
        }
    }
}

/// Repository for Customer database operations
pub struct CustomerRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> CustomerRepository<'a, C> {
    /// Create a new CustomerRepository with the given connection
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Find a customer by its natural key
    pub async fn find_by_shopify_id(
        &self,
        tenant_id: Uuid,
        shopify_customer_id: i64,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(customer::Column::TenantId.eq(tenant_id))
            .filter(customer::Column::ShopifyCustomerId.eq(shopify_customer_id))
            .one(self.db)
            .await
    }

    /// Upsert a customer on (tenant, shopify_customer_id).
    ///
    /// Missing source timestamps default to the current time (the webhook
    /// ingest convention). Returns the model and whether a row was created.
    pub async fn upsert(
        &self,
        tenant_id: Uuid,
        record: &CustomerRecord,
    ) -> Result<(Model, bool), sea_orm::DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let created_at: DateTimeWithTimeZone =
            record.created_at.map(Into::into).unwrap_or(now);
        let updated_at: DateTimeWithTimeZone =
            record.updated_at.map(Into::into).unwrap_or(now);

        if let Some(existing) = self
            .find_by_shopify_id(tenant_id, record.shopify_customer_id)
            .await?
        {
            let mut active = existing.into_active_model();
            active.first_name = Set(record.first_name.clone());
            active.last_name = Set(record.last_name.clone());
            active.email = Set(record.email.clone());
            active.phone = Set(record.phone.clone());
            if !record.embedded {
                active.address1 = Set(record.address1.clone());
                active.address2 = Set(record.address2.clone());
                active.city = Set(record.city.clone());
                active.province = Set(record.province.clone());
                active.country = Set(record.country.clone());
                active.zip = Set(record.zip.clone());
                active.company = Set(record.company.clone());
            }
            active.created_at = Set(created_at);
            active.updated_at = Set(updated_at);
            let updated = active.update(self.db).await?;
            return Ok((updated, false));
        }

        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            shopify_customer_id: Set(record.shopify_customer_id),
            first_name: Set(record.first_name.clone()),
            last_name: Set(record.last_name.clone()),
            email: Set(record.email.clone()),
            phone: Set(record.phone.clone()),
            address1: Set(record.address1.clone()),
            address2: Set(record.address2.clone()),
            city: Set(record.city.clone()),
            province: Set(record.province.clone()),
            country: Set(record.country.clone()),
            zip: Set(record.zip.clone()),
            company: Set(record.company.clone()),
            created_at: Set(created_at),
            updated_at: Set(updated_at),
        };

        let inserted = model.insert(self.db).await?;
        Ok((inserted, true))
    }

    /// Get the customer keyed by (tenant, shopify_customer_id), creating it
    /// if absent but never updating an existing row. Backfilled orders use
    /// this so historical order data cannot clobber fresher webhook data.
    pub async fn get_or_create(
        &self,
        tenant_id: Uuid,
        record: &CustomerRecord,
    ) -> Result<Model, sea_orm::DbErr> {
        if let Some(existing) = self
            .find_by_shopify_id(tenant_id, record.shopify_customer_id)
            .await?
        {
            return Ok(existing);
        }

        let (model, _) = self.upsert(tenant_id, record).await?;
        Ok(model)
    }

    /// Count customers for a tenant
    pub async fn count_by_tenant(&self, tenant_id: Uuid) -> Result<u64, sea_orm::DbErr> {
        Entity::find()
            .filter(customer::Column::TenantId.eq(tenant_id))
            .count(self.db)
            .await
    }
}

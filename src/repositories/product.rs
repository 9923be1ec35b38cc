//! # Product Repository
//!
//! Variant fan-out and idempotent upserts keyed by
//! (tenant_id, shopify_variant_id). A catalog entry with N variants becomes
//! N rows; replaying the identical catalog payload leaves exactly N rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
};
use uuid::Uuid;

use crate::models::product::{self, ActiveModel, Entity, Model};
use crate::shopify::types::ShopifyProduct;

/// Flattened per-variant fields ready for an upsert.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub shopify_variant_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub sku: Option<String>,
    pub inventory_quantity: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductRecord {
    /// Fan a catalog entry out into one record per variant.
    ///
    /// The row title composes catalog and variant titles; timestamps prefer
    /// variant-level values and fall back to catalog-level ones
    /// (published_at stands in for a missing catalog created_at).
    pub fn fan_out(catalog: &ShopifyProduct) -> Vec<Self> {
        catalog
            .variants
            .iter()
            .map(|variant| Self {
                shopify_variant_id: variant.id,
                title: format!(
                    "{} - {}",
                    catalog.title,
                    variant.title.as_deref().unwrap_or_default()
                ),
                description: catalog.body_html.clone(),
                price: variant.price,
                sku: variant.sku.clone(),
                inventory_quantity: variant.inventory_quantity.unwrap_or(0),
                created_at: variant
                    .created_at
                    .or(catalog.created_at)
                    .or(catalog.published_at),
                updated_at: variant.updated_at.or(catalog.updated_at),
            })
            .collect()
    }
}

/// Repository for Product database operations
pub struct ProductRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ProductRepository<'a, C> {
    /// Create a new ProductRepository with the given connection
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Find a product by its variant natural key
    pub async fn find_by_variant_id(
        &self,
        tenant_id: Uuid,
        shopify_variant_id: i64,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(product::Column::TenantId.eq(tenant_id))
            .filter(product::Column::ShopifyVariantId.eq(shopify_variant_id))
            .one(self.db)
            .await
    }

    /// Upsert one variant row on (tenant, shopify_variant_id).
    pub async fn upsert(
        &self,
        tenant_id: Uuid,
        record: &ProductRecord,
    ) -> Result<(Model, bool), sea_orm::DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let created_at: DateTimeWithTimeZone =
            record.created_at.map(Into::into).unwrap_or(now);
        let updated_at: DateTimeWithTimeZone =
            record.updated_at.map(Into::into).unwrap_or(now);

        if let Some(existing) = self
            .find_by_variant_id(tenant_id, record.shopify_variant_id)
            .await?
        {
            let mut active = existing.into_active_model();
            active.title = Set(record.title.clone());
            active.description = Set(record.description.clone());
            active.price = Set(record.price);
            active.sku = Set(record.sku.clone());
            active.inventory_quantity = Set(record.inventory_quantity);
            active.created_at = Set(created_at);
            active.updated_at = Set(updated_at);
            let updated = active.update(self.db).await?;
            return Ok((updated, false));
        }

        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            shopify_variant_id: Set(record.shopify_variant_id),
            title: Set(record.title.clone()),
            description: Set(record.description.clone()),
            price: Set(record.price),
            sku: Set(record.sku.clone()),
            inventory_quantity: Set(record.inventory_quantity),
            created_at: Set(created_at),
            updated_at: Set(updated_at),
        };

        let inserted = model.insert(self.db).await?;
        Ok((inserted, true))
    }
}

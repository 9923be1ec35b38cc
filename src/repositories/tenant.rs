//! # Tenant Repository
//!
//! This module contains the repository implementation for Tenant entities.
//! Tenants are upserted by shop domain at OAuth completion, so re-auth
//! rotates the stored token ciphertext in place instead of duplicating the
//! row.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
};
use uuid::Uuid;

use crate::models::tenant::{self, ActiveModel, Entity, Model};

/// Repository for Tenant database operations
pub struct TenantRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> TenantRepository<'a, C> {
    /// Create a new TenantRepository with the given connection
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Get tenant by ID
    pub async fn find_by_id(&self, tenant_id: Uuid) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find_by_id(tenant_id).one(self.db).await
    }

    /// Resolve a tenant by its shop domain
    pub async fn find_by_domain(&self, shopify_domain: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(tenant::Column::ShopifyDomain.eq(shopify_domain))
            .one(self.db)
            .await
    }

    /// Resolve the tenant owned by a user
    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(tenant::Column::UserId.eq(user_id))
            .one(self.db)
            .await
    }

    /// Upsert the tenant keyed by shop domain.
    ///
    /// Re-auth of a connected shop updates the owner, display name, and
    /// token ciphertext on the existing row.
    pub async fn upsert_by_domain(
        &self,
        shopify_domain: &str,
        user_id: Uuid,
        name: &str,
        access_token_ciphertext: Vec<u8>,
    ) -> Result<Model, sea_orm::DbErr> {
        let now = Utc::now();

        if let Some(existing) = self.find_by_domain(shopify_domain).await? {
            let mut active = existing.into_active_model();
            active.user_id = Set(user_id);
            active.name = Set(name.to_string());
            active.access_token_ciphertext = Set(access_token_ciphertext);
            active.updated_at = Set(now.into());
            return active.update(self.db).await;
        }

        let tenant = ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            name: Set(name.to_string()),
            shopify_domain: Set(shopify_domain.to_string()),
            access_token_ciphertext: Set(access_token_ciphertext),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        tenant.insert(self.db).await
    }
}

//! # User Repository
//!
//! Get-or-create semantics keyed by email: re-authentication of a known
//! shop resolves to the existing user without touching its fields.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::models::user::{self, ActiveModel, Entity, Model};

/// Repository for User database operations
pub struct UserRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    /// Create a new UserRepository with the given connection
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db)
            .await
    }

    /// Get the user keyed by email, creating it with the given profile
    /// fields if absent. Returns the model and whether it was created.
    pub async fn get_or_create(
        &self,
        email: &str,
        first_name: Option<String>,
        last_name: Option<String>,
        password_hash: String,
    ) -> Result<(Model, bool), sea_orm::DbErr> {
        if let Some(existing) = self.find_by_email(email).await? {
            return Ok((existing, false));
        }

        let now = Utc::now();
        let user = ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            first_name: Set(first_name),
            last_name: Set(last_name),
            password_hash: Set(password_hash),
            created_at: Set(now.into()),
        };

        let created = user.insert(self.db).await?;
        Ok((created, true))
    }

    /// Find a user by id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find_by_id(id).one(self.db).await
    }
}

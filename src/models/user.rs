//! User entity model
//!
//! This module contains the SeaORM entity model for the users table. Users
//! are resolved by shop email at OAuth completion; the password hash is a
//! random placeholder that can never authenticate.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Email address, unique; sourced from the shop profile
    pub email: String,

    /// First name split from the shop owner's display name
    pub first_name: Option<String>,

    /// Remainder of the shop owner's display name
    pub last_name: Option<String>,

    /// Unusable placeholder; login is session based, never by password
    pub password_hash: String,

    /// Timestamp when the user was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::tenant::Entity")]
    Tenant,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Migration to create the tenants table.
//!
//! One tenant per connected Shopify store. The access token is stored as
//! AES-256-GCM ciphertext bound to the shop domain; the shop domain is
//! globally unique and each user owns at most one tenant.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tenants::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tenants::UserId).uuid().not_null())
                    .col(ColumnDef::new(Tenants::Name).text().not_null())
                    .col(ColumnDef::new(Tenants::ShopifyDomain).text().not_null())
                    .col(
                        ColumnDef::new(Tenants::AccessTokenCiphertext)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tenants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tenants::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tenants_user_id")
                            .from(Tenants::Table, Tenants::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tenants_shopify_domain")
                    .table(Tenants::Table)
                    .col(Tenants::ShopifyDomain)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // One user owns at most one tenant
        manager
            .create_index(
                Index::create()
                    .name("idx_tenants_user_id")
                    .table(Tenants::Table)
                    .col(Tenants::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_tenants_shopify_domain").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_tenants_user_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Tenants::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
    UserId,
    Name,
    ShopifyDomain,
    AccessTokenCiphertext,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

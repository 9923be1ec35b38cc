//! Migration to create the customers table.
//!
//! Customers are tenant-scoped with a natural key of
//! (tenant_id, shopify_customer_id); contact and address fields are
//! denormalized from the richest webhook payload seen.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Customers::TenantId).uuid().not_null())
                    .col(
                        ColumnDef::new(Customers::ShopifyCustomerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Customers::FirstName).text().null())
                    .col(ColumnDef::new(Customers::LastName).text().null())
                    .col(ColumnDef::new(Customers::Email).text().null())
                    .col(ColumnDef::new(Customers::Phone).text().null())
                    .col(ColumnDef::new(Customers::Address1).text().null())
                    .col(ColumnDef::new(Customers::Address2).text().null())
                    .col(ColumnDef::new(Customers::City).text().null())
                    .col(ColumnDef::new(Customers::Province).text().null())
                    .col(ColumnDef::new(Customers::Country).text().null())
                    .col(ColumnDef::new(Customers::Zip).text().null())
                    .col(ColumnDef::new(Customers::Company).text().null())
                    .col(
                        ColumnDef::new(Customers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Customers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customers_tenant_id")
                            .from(Customers::Table, Customers::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Natural key for idempotent upserts from both backfill and webhooks
        manager
            .create_index(
                Index::create()
                    .name("idx_customers_tenant_shopify_id")
                    .table(Customers::Table)
                    .col(Customers::TenantId)
                    .col(Customers::ShopifyCustomerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_customers_tenant_id")
                    .table(Customers::Table)
                    .col(Customers::TenantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_customers_tenant_shopify_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_customers_tenant_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    TenantId,
    ShopifyCustomerId,
    FirstName,
    LastName,
    Email,
    Phone,
    Address1,
    Address2,
    City,
    Province,
    Country,
    Zip,
    Company,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}

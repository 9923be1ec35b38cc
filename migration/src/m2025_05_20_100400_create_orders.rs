//! Migration to create the orders table.
//!
//! Orders are tenant-scoped on (tenant_id, shopify_order_id). The customer
//! reference is nullable and survives customer deletion via SET NULL.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::TenantId).uuid().not_null())
                    .col(
                        ColumnDef::new(Orders::ShopifyOrderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::CustomerId).uuid().null())
                    .col(
                        ColumnDef::new(Orders::TotalPrice)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::Currency)
                            .text()
                            .not_null()
                            .default("USD"),
                    )
                    .col(ColumnDef::new(Orders::FinancialStatus).text().null())
                    .col(ColumnDef::new(Orders::FulfillmentStatus).text().null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_tenant_id")
                            .from(Orders::Table, Orders::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_customer_id")
                            .from(Orders::Table, Orders::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_tenant_shopify_id")
                    .table(Orders::Table)
                    .col(Orders::TenantId)
                    .col(Orders::ShopifyOrderId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Dashboard aggregates filter by tenant and bucket by creation date
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_tenant_created_at")
                    .table(Orders::Table)
                    .col(Orders::TenantId)
                    .col(Orders::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_orders_tenant_shopify_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_orders_tenant_created_at").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    TenantId,
    ShopifyOrderId,
    CustomerId,
    TotalPrice,
    Currency,
    FinancialStatus,
    FulfillmentStatus,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
}

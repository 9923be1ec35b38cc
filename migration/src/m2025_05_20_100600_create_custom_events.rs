//! Migration to create the custom_events table.
//!
//! Checkout lifecycle events land here as an append-only log; the full
//! inbound payload is retained verbatim in the metadata column.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CustomEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CustomEvents::TenantId).uuid().not_null())
                    .col(ColumnDef::new(CustomEvents::EventType).text().not_null())
                    .col(ColumnDef::new(CustomEvents::CustomerId).uuid().null())
                    .col(
                        ColumnDef::new(CustomEvents::Metadata)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_custom_events_tenant_id")
                            .from(CustomEvents::Table, CustomEvents::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_custom_events_customer_id")
                            .from(CustomEvents::Table, CustomEvents::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_custom_events_tenant_id")
                    .table(CustomEvents::Table)
                    .col(CustomEvents::TenantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_custom_events_tenant_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CustomEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CustomEvents {
    Table,
    Id,
    TenantId,
    EventType,
    CustomerId,
    Metadata,
    CreatedAt,
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

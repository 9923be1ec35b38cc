//! Database migrations for the Shoplytics API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_05_20_100000_create_users;
mod m2025_05_20_100100_create_tenants;
mod m2025_05_20_100200_create_customers;
mod m2025_05_20_100300_create_products;
mod m2025_05_20_100400_create_orders;
mod m2025_05_20_100500_create_order_items;
mod m2025_05_20_100600_create_custom_events;
mod m2025_05_20_100700_create_webhook_subscriptions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_05_20_100000_create_users::Migration),
            Box::new(m2025_05_20_100100_create_tenants::Migration),
            Box::new(m2025_05_20_100200_create_customers::Migration),
            Box::new(m2025_05_20_100300_create_products::Migration),
            Box::new(m2025_05_20_100400_create_orders::Migration),
            Box::new(m2025_05_20_100500_create_order_items::Migration),
            Box::new(m2025_05_20_100600_create_custom_events::Migration),
            Box::new(m2025_05_20_100700_create_webhook_subscriptions::Migration),
        ]
    }
}

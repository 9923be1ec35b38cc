//! # Data Models
//!
//! This module contains all the data models used throughout the Shoplytics API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod custom_event;
pub mod customer;
pub mod order;
pub mod order_item;
pub mod product;
pub mod tenant;
pub mod user;
pub mod webhook_subscription;

pub use custom_event::Entity as CustomEvent;
pub use customer::Entity as Customer;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use tenant::Entity as Tenant;
pub use user::Entity as User;
pub use webhook_subscription::Entity as WebhookSubscription;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "shoplytics".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

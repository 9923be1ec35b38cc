//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities, providing a clean API for data access with tenant-aware methods.
//!
//! Repositories are generic over [`sea_orm::ConnectionTrait`] so the same
//! upsert logic runs against the pool or inside an open transaction (the
//! order-create path); all upserts are idempotent on their natural key.

pub mod custom_event;
pub mod customer;
pub mod order;
pub mod product;
pub mod tenant;
pub mod user;
pub mod webhook_subscription;

pub use custom_event::CustomEventRepository;
pub use customer::CustomerRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use tenant::TenantRepository;
pub use user::UserRepository;
pub use webhook_subscription::WebhookSubscriptionRepository;

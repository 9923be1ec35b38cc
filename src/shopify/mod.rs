//! # Shopify Platform Adapter
//!
//! Typed payload schemas, the OAuth handshake primitives, and the outbound
//! REST client for the Shopify admin API. Everything that touches the wire
//! format of the external platform lives here; handlers and sync jobs only
//! see parsed structs.

pub mod client;
pub mod oauth;
pub mod types;

pub use client::{ShopifyClient, ShopifyClientError};

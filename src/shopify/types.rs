//! Typed Shopify payload schemas.
//!
//! Every inbound webhook body and outbound listing response is parsed into
//! these structs once at the boundary; nothing downstream touches raw JSON.
//! Field coverage follows what the ingest and backfill paths actually read,
//! not the full platform schema.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Customer payload as delivered by customer webhooks, order/checkout
/// embeddings, and the customers listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyCustomer {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub default_address: Option<ShopifyAddress>,
}

/// Embedded default address on a customer payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyAddress {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

/// Catalog entry; fans out into one local product row per variant.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyProduct {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub variants: Vec<ShopifyVariant>,
}

/// Variant of a catalog entry; orders reference variants by id.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyVariant {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub inventory_quantity: Option<i32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Order payload from the orders webhook and the orders listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyOrder {
    pub id: i64,
    #[serde(default)]
    pub customer: Option<ShopifyCustomer>,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_price: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub line_items: Vec<ShopifyLineItem>,
}

/// Order line; resolved against local products by variant id.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyLineItem {
    #[serde(default)]
    pub variant_id: Option<i64>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

/// The customer embedding is all the checkout ingest path reads with types;
/// the payload itself is retained verbatim as event metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyCheckout {
    #[serde(default)]
    pub customer: Option<ShopifyCustomer>,
}

/// Token endpoint response from the authorization-code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Envelope around the shop profile endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopProfileResponse {
    pub shop: ShopProfile,
}

/// Shop profile fields used to resolve the owning user.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub shop_owner: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Webhook registration request body.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookRegistrationRequest {
    pub webhook: WebhookRegistrationBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookRegistrationBody {
    pub topic: String,
    pub address: String,
    pub format: String,
}

impl WebhookRegistrationRequest {
    pub fn json(topic: &str, address: &str) -> Self {
        Self {
            webhook: WebhookRegistrationBody {
                topic: topic.to_string(),
                address: address.to_string(),
                format: "json".to_string(),
            },
        }
    }
}

/// Listing page envelopes for the three backfilled resources.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductsPage {
    #[serde(default)]
    pub products: Vec<ShopifyProduct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomersPage {
    #[serde(default)]
    pub customers: Vec<ShopifyCustomer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrdersPage {
    #[serde(default)]
    pub orders: Vec<ShopifyOrder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_payload_parses_with_string_prices() {
        let payload = serde_json::json!({
            "id": 820982911946154508_i64,
            "total_price": "254.98",
            "currency": "USD",
            "financial_status": "paid",
            "created_at": "2024-03-01T10:00:00-05:00",
            "customer": {
                "id": 115310627314723954_i64,
                "first_name": "John",
                "last_name": "Smith",
                "email": "john@example.com"
            },
            "line_items": [
                {"variant_id": 871, "quantity": 1, "price": "199.99"},
                {"variant_id": 872, "quantity": 5, "price": "10.99"}
            ]
        });

        let order: ShopifyOrder = serde_json::from_value(payload).unwrap();
        assert_eq!(order.total_price, Decimal::new(25498, 2));
        assert_eq!(order.line_items.len(), 2);
        assert_eq!(order.line_items[0].variant_id, Some(871));
        assert_eq!(
            order.customer.as_ref().unwrap().email.as_deref(),
            Some("john@example.com")
        );
    }

    #[test]
    fn test_product_payload_defaults_missing_variants() {
        let payload = serde_json::json!({
            "id": 788032119674292922_i64,
            "title": "Example T-Shirt"
        });

        let product: ShopifyProduct = serde_json::from_value(payload).unwrap();
        assert!(product.variants.is_empty());
        assert!(product.published_at.is_none());
    }

    #[test]
    fn test_customer_default_address_fallback_fields() {
        let payload = serde_json::json!({
            "id": 706405506930370084_i64,
            "email": "bob@biller.com",
            "phone": null,
            "default_address": {
                "phone": "555-625-1199",
                "city": "Ottawa",
                "zip": "K2P0V6"
            }
        });

        let customer: ShopifyCustomer = serde_json::from_value(payload).unwrap();
        assert!(customer.phone.is_none());
        let address = customer.default_address.unwrap();
        assert_eq!(address.phone.as_deref(), Some("555-625-1199"));
        assert_eq!(address.city.as_deref(), Some("Ottawa"));
    }

    #[test]
    fn test_registration_request_shape() {
        let request = WebhookRegistrationRequest::json(
            "orders/create",
            "https://app.example.com/api/orders/",
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["webhook"]["topic"], "orders/create");
        assert_eq!(value["webhook"]["format"], "json");
    }
}

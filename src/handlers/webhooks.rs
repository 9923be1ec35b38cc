//! # Webhook Ingest Handlers
//!
//! This module contains handlers for the live webhook deliveries from
//! Shopify: customers, products (variant fan-out), orders (atomic with
//! their line items), and checkout lifecycle events.
//!
//! Tenant resolution trusts the `X-Shopify-Shop-Domain` header with no
//! cryptographic verification of webhook authenticity — unlike the OAuth
//! callback's HMAC check. Flagged as a gap; kept as-is deliberately.

use axum::{
    extract::{Json, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use metrics::counter;
use sea_orm::TransactionTrait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::error::{self, ApiError, validation_error};
use crate::models::{custom_event, customer, order, order_item, product, tenant};
use crate::repositories::customer::CustomerRecord;
use crate::repositories::order::OrderRecord;
use crate::repositories::product::ProductRecord;
use crate::repositories::{
    CustomEventRepository, CustomerRepository, OrderRepository, ProductRepository,
    TenantRepository,
};
use crate::server::AppState;
use crate::shopify::types::{ShopifyCheckout, ShopifyCustomer, ShopifyOrder, ShopifyProduct};

const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";
const TOPIC_HEADER: &str = "X-Shopify-Topic";

/// Order ingest response: the upserted order with its line items.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Resolve the tenant named by the shop-domain header.
async fn resolve_tenant(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<tenant::Model, ApiError> {
    let shop_domain = headers
        .get(SHOP_DOMAIN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            validation_error(
                "Missing required header",
                serde_json::json!({ SHOP_DOMAIN_HEADER: "Required header is missing" }),
            )
        })?;

    TenantRepository::new(&state.db)
        .find_by_domain(shop_domain)
        .await?
        .ok_or_else(|| error::unknown_tenant(shop_domain))
}

/// Ingest a customer-create webhook.
#[utoipa::path(
    post,
    path = "/api/customers/",
    request_body = JsonValue,
    responses(
        (status = 201, description = "Customer created"),
        (status = 200, description = "Customer updated"),
        (status = 400, description = "Unknown tenant or invalid payload", body = ApiError)
    ),
    tag = "ingest"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ShopifyCustomer>, JsonRejection>,
) -> Result<(StatusCode, Json<customer::Model>), ApiError> {
    let Json(payload) = payload?;
    let tenant = resolve_tenant(&state, &headers).await?;

    let record = CustomerRecord::from_profile(&payload);
    let (customer, created) = CustomerRepository::new(&state.db)
        .upsert(tenant.id, &record)
        .await?;

    counter!("webhook_ingest_total", "resource" => "customers").increment(1);
    info!(shop = %tenant.shopify_domain, customer_id = payload.id, created, "Customer ingested");

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(customer)))
}

/// Ingest a product-create webhook, fanning variants out into rows.
#[utoipa::path(
    post,
    path = "/api/products/",
    request_body = JsonValue,
    responses(
        (status = 201, description = "Variant rows created or updated"),
        (status = 400, description = "Unknown tenant or payload without variants", body = ApiError)
    ),
    tag = "ingest"
)]
pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ShopifyProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<product::Model>>), ApiError> {
    let Json(payload) = payload?;
    if payload.variants.is_empty() {
        return Err(error::no_variants());
    }

    let tenant = resolve_tenant(&state, &headers).await?;

    let repo = ProductRepository::new(&state.db);
    let mut rows = Vec::with_capacity(payload.variants.len());
    for record in ProductRecord::fan_out(&payload) {
        let (row, _) = repo.upsert(tenant.id, &record).await?;
        rows.push(row);
    }

    counter!("webhook_ingest_total", "resource" => "products").increment(1);
    info!(
        shop = %tenant.shopify_domain,
        product_id = payload.id,
        variants = rows.len(),
        "Product ingested"
    );

    Ok((StatusCode::CREATED, Json(rows)))
}

/// Ingest an order-create webhook.
///
/// The whole order — embedded customer, order row, every line item — is one
/// transaction. A line item referencing a variant that is not in the local
/// catalog aborts everything: live order creation does not tolerate partial
/// catalogs the way backfill does.
#[utoipa::path(
    post,
    path = "/api/orders/",
    request_body = JsonValue,
    responses(
        (status = 201, description = "Order created"),
        (status = 200, description = "Order updated"),
        (status = 400, description = "Unknown tenant, unknown product, or invalid payload", body = ApiError)
    ),
    tag = "ingest"
)]
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ShopifyOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(payload) = payload?;
    let tenant = resolve_tenant(&state, &headers).await?;

    let txn = state.db.begin().await?;

    let customer_id = match &payload.customer {
        Some(embedded) => {
            let (customer, _) = CustomerRepository::new(&txn)
                .upsert(tenant.id, &CustomerRecord::from_embedded(embedded))
                .await?;
            Some(customer.id)
        }
        None => None,
    };

    let orders = OrderRepository::new(&txn);
    let (order, created) = orders
        .upsert(tenant.id, &OrderRecord::from_payload(&payload, customer_id))
        .await?;

    let products = ProductRepository::new(&txn);
    for item in &payload.line_items {
        let Some(variant_id) = item.variant_id else {
            txn.rollback().await?;
            return Err(validation_error(
                "Order line item missing variant_id",
                serde_json::json!({ "line_items": "every item must reference a variant" }),
            ));
        };

        let Some(product) = products.find_by_variant_id(tenant.id, variant_id).await? else {
            warn!(
                shop = %tenant.shopify_domain,
                order_id = payload.id,
                variant_id,
                "Aborting order ingest: unknown product"
            );
            txn.rollback().await?;
            return Err(error::unknown_product(variant_id));
        };

        orders
            .upsert_item(order.id, product.id, item.quantity.unwrap_or(1), item.price)
            .await?;
    }

    let items = orders.list_items(order.id).await?;
    txn.commit().await?;

    counter!("webhook_ingest_total", "resource" => "orders").increment(1);
    info!(shop = %tenant.shopify_domain, order_id = payload.id, created, "Order ingested");

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(OrderResponse { order, items })))
}

/// Ingest a checkout lifecycle webhook as an append-only custom event.
#[utoipa::path(
    post,
    path = "/api/custom-events/",
    request_body = JsonValue,
    responses(
        (status = 201, description = "Event recorded"),
        (status = 400, description = "Unknown tenant or invalid payload", body = ApiError)
    ),
    tag = "ingest"
)]
pub async fn create_custom_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> Result<(StatusCode, Json<custom_event::Model>), ApiError> {
    let Json(payload) = payload?;
    let tenant = resolve_tenant(&state, &headers).await?;

    let topic = headers
        .get(TOPIC_HEADER)
        .and_then(|value| value.to_str().ok());
    let event_type = classify_checkout_topic(topic);

    // The typed view only pulls the embedded customer; the event keeps the
    // payload verbatim regardless of shape.
    let checkout: ShopifyCheckout =
        serde_json::from_value(payload.clone()).unwrap_or(ShopifyCheckout { customer: None });

    let customer_id = match &checkout.customer {
        Some(embedded) => {
            let (customer, _) = CustomerRepository::new(&state.db)
                .upsert(tenant.id, &CustomerRecord::from_embedded(embedded))
                .await?;
            Some(customer.id)
        }
        None => None,
    };

    let event = CustomEventRepository::new(&state.db)
        .insert(tenant.id, event_type, customer_id, payload)
        .await?;

    counter!("webhook_ingest_total", "resource" => "custom_events").increment(1);
    info!(shop = %tenant.shopify_domain, event_type, "Checkout event recorded");

    Ok((StatusCode::CREATED, Json(event)))
}

/// Classify the inbound webhook topic into a checkout event type.
fn classify_checkout_topic(topic: Option<&str>) -> &'static str {
    match topic {
        Some("checkouts/create") => "checkout_started",
        Some("checkouts/update") => "checkout_updated",
        Some("checkouts/delete") => "checkout_deleted",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_checkout_topic() {
        assert_eq!(
            classify_checkout_topic(Some("checkouts/create")),
            "checkout_started"
        );
        assert_eq!(
            classify_checkout_topic(Some("checkouts/update")),
            "checkout_updated"
        );
        assert_eq!(
            classify_checkout_topic(Some("checkouts/delete")),
            "checkout_deleted"
        );
        assert_eq!(classify_checkout_topic(Some("orders/create")), "unknown");
        assert_eq!(classify_checkout_topic(None), "unknown");
    }
}

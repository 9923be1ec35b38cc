//! Webhook subscription registration.
//!
//! Registers the six ingest topics with Shopify on behalf of a tenant, one
//! POST per topic. Topics fail independently: every attempt's outcome is
//! upserted into the (tenant, topic) audit row and a failure on one topic
//! never aborts the remaining ones.

use metrics::counter;
use sea_orm::DatabaseConnection;
use serde_json::{Value as JsonValue, json};
use tracing::{info, warn};

use crate::models::tenant::Model as TenantModel;
use crate::repositories::WebhookSubscriptionRepository;
use crate::shopify::ShopifyClient;

/// Fixed (topic, local endpoint path) registration set.
pub const WEBHOOK_TOPICS: [(&str, &str); 6] = [
    ("orders/create", "/api/orders/"),
    ("products/create", "/api/products/"),
    ("customers/create", "/api/customers/"),
    ("checkouts/create", "/api/custom-events/"),
    ("checkouts/update", "/api/custom-events/"),
    ("checkouts/delete", "/api/custom-events/"),
];

/// Registers webhook topics for a tenant and records each outcome.
pub struct WebhookSubscriber {
    client: ShopifyClient,
    base_url: String,
}

impl WebhookSubscriber {
    /// Create a new subscriber; `base_url` is this deployment's public base.
    pub fn new(client: ShopifyClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Register all topics for the tenant.
    ///
    /// The only error surfaced is a database failure while writing an audit
    /// row; registration failures are data, not errors.
    pub async fn subscribe(
        &self,
        db: &DatabaseConnection,
        tenant: &TenantModel,
        access_token: &str,
    ) -> Result<(), sea_orm::DbErr> {
        let repo = WebhookSubscriptionRepository::new(db);

        for (topic, path) in WEBHOOK_TOPICS {
            let address = format!("{}{}", self.base_url, path);

            let (status, last_response) = match self
                .client
                .register_webhook(&tenant.shopify_domain, access_token, topic, &address)
                .await
            {
                Ok(outcome) if outcome.is_success() => {
                    info!(
                        shop = %tenant.shopify_domain,
                        topic,
                        "Webhook registered"
                    );
                    ("success".to_string(), response_json(&outcome.body))
                }
                Ok(outcome) => {
                    warn!(
                        shop = %tenant.shopify_domain,
                        topic,
                        status = outcome.status,
                        "Webhook registration rejected"
                    );
                    (
                        format!("http_error:{}", outcome.status),
                        response_json(&outcome.body),
                    )
                }
                Err(err) => {
                    warn!(
                        shop = %tenant.shopify_domain,
                        topic,
                        error = %err,
                        "Webhook registration failed"
                    );
                    ("error".to_string(), Some(json!({ "error": err.to_string() })))
                }
            };

            counter!("webhook_registrations_total", "status" => status.clone()).increment(1);

            repo.upsert(tenant.id, topic, &address, &status, last_response)
                .await?;
        }

        Ok(())
    }
}

/// Keep the raw response body verbatim; non-JSON bodies are wrapped.
fn response_json(body: &str) -> Option<JsonValue> {
    if body.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str(body)
            .unwrap_or_else(|_| json!({ "raw": body })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_set_matches_ingest_routes() {
        assert_eq!(WEBHOOK_TOPICS.len(), 6);

        let checkout_topics: Vec<&str> = WEBHOOK_TOPICS
            .iter()
            .filter(|(_, path)| *path == "/api/custom-events/")
            .map(|(topic, _)| *topic)
            .collect();
        assert_eq!(
            checkout_topics,
            ["checkouts/create", "checkouts/update", "checkouts/delete"]
        );
    }

    #[test]
    fn test_response_json_wraps_non_json_bodies() {
        assert_eq!(response_json(""), None);
        assert_eq!(
            response_json("{\"webhook\":{\"id\":1}}"),
            Some(json!({"webhook": {"id": 1}}))
        );
        assert_eq!(
            response_json("upstream exploded"),
            Some(json!({"raw": "upstream exploded"}))
        );
    }
}

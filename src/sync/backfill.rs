//! Historical backfill engine.
//!
//! One-time bulk import of a tenant's existing products, customers, and
//! orders, walked in that sequence against the versioned listing endpoints.
//! Each walk follows the `Link: rel="next"` cursor until it runs out,
//! throttling between pages; any upstream failure ends that resource's walk
//! silently and the sync moves on. Partial sync is accepted because every
//! upsert is idempotent and a later pass (or a live webhook) converges the
//! data.

use std::time::Duration;

use metrics::counter;
use sea_orm::DatabaseConnection;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::BackfillConfig;
use crate::models::tenant::Model as TenantModel;
use crate::repositories::customer::CustomerRecord;
use crate::repositories::order::OrderRecord;
use crate::repositories::product::ProductRecord;
use crate::repositories::{CustomerRepository, OrderRepository, ProductRepository};
use crate::shopify::client::ListingPage;
use crate::shopify::types::{CustomersPage, OrdersPage, ProductsPage};
use crate::shopify::{ShopifyClient, ShopifyClientError};

/// Counters from one backfill pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillSummary {
    pub product_pages: u32,
    pub products_upserted: u32,
    pub customer_pages: u32,
    pub customers_upserted: u32,
    pub order_pages: u32,
    pub orders_upserted: u32,
    pub line_items_skipped: u32,
}

/// Walks a tenant's historical data into the local store.
pub struct BackfillEngine {
    client: ShopifyClient,
    config: BackfillConfig,
}

impl BackfillEngine {
    /// Create a new backfill engine.
    pub fn new(client: ShopifyClient, config: BackfillConfig) -> Self {
        Self { client, config }
    }

    /// Run the three resource walks in sequence for one tenant.
    ///
    /// Upstream HTTP failures terminate only the walk they occur in;
    /// database errors abort the pass and surface to the job runner.
    pub async fn sync(
        &self,
        db: &DatabaseConnection,
        tenant: &TenantModel,
        access_token: &str,
    ) -> Result<BackfillSummary, sea_orm::DbErr> {
        info!(shop = %tenant.shopify_domain, "Starting historical backfill");

        let mut summary = BackfillSummary::default();
        self.sync_products(db, tenant, access_token, &mut summary)
            .await?;
        self.sync_customers(db, tenant, access_token, &mut summary)
            .await?;
        self.sync_orders(db, tenant, access_token, &mut summary)
            .await?;

        info!(
            shop = %tenant.shopify_domain,
            products = summary.products_upserted,
            customers = summary.customers_upserted,
            orders = summary.orders_upserted,
            "Historical backfill finished"
        );

        Ok(summary)
    }

    async fn sync_products(
        &self,
        db: &DatabaseConnection,
        tenant: &TenantModel,
        access_token: &str,
        summary: &mut BackfillSummary,
    ) -> Result<(), sea_orm::DbErr> {
        let repo = ProductRepository::new(db);
        let mut url = Some(self.client.listing_url(
            &tenant.shopify_domain,
            "products",
            self.config.page_limit,
        ));

        while let Some(current) = url.take() {
            let page: ListingPage<ProductsPage> =
                match self.client.fetch_page(&current, access_token).await {
                    Ok(page) => page,
                    Err(err) => {
                        log_walk_end(&tenant.shopify_domain, "products", &err);
                        break;
                    }
                };

            summary.product_pages += 1;
            counter!("backfill_pages_total", "resource" => "products").increment(1);

            for catalog in &page.body.products {
                for record in ProductRecord::fan_out(catalog) {
                    repo.upsert(tenant.id, &record).await?;
                    summary.products_upserted += 1;
                }
            }

            url = page.next_url;
            if url.is_some() {
                sleep(Duration::from_millis(self.config.page_delay_ms)).await;
            }
        }

        Ok(())
    }

    async fn sync_customers(
        &self,
        db: &DatabaseConnection,
        tenant: &TenantModel,
        access_token: &str,
        summary: &mut BackfillSummary,
    ) -> Result<(), sea_orm::DbErr> {
        let repo = CustomerRepository::new(db);
        let mut url = Some(self.client.listing_url(
            &tenant.shopify_domain,
            "customers",
            self.config.page_limit,
        ));

        while let Some(current) = url.take() {
            let page: ListingPage<CustomersPage> =
                match self.client.fetch_page(&current, access_token).await {
                    Ok(page) => page,
                    Err(err) => {
                        log_walk_end(&tenant.shopify_domain, "customers", &err);
                        break;
                    }
                };

            summary.customer_pages += 1;
            counter!("backfill_pages_total", "resource" => "customers").increment(1);

            for payload in &page.body.customers {
                let record = CustomerRecord::from_profile(payload);
                repo.upsert(tenant.id, &record).await?;
                summary.customers_upserted += 1;
            }

            url = page.next_url;
            if url.is_some() {
                sleep(Duration::from_millis(self.config.page_delay_ms)).await;
            }
        }

        Ok(())
    }

    async fn sync_orders(
        &self,
        db: &DatabaseConnection,
        tenant: &TenantModel,
        access_token: &str,
        summary: &mut BackfillSummary,
    ) -> Result<(), sea_orm::DbErr> {
        let customers = CustomerRepository::new(db);
        let products = ProductRepository::new(db);
        let orders = OrderRepository::new(db);

        let mut url = Some(self.client.listing_url(
            &tenant.shopify_domain,
            "orders",
            self.config.page_limit,
        ));

        while let Some(current) = url.take() {
            let page: ListingPage<OrdersPage> =
                match self.client.fetch_page(&current, access_token).await {
                    Ok(page) => page,
                    Err(err) => {
                        log_walk_end(&tenant.shopify_domain, "orders", &err);
                        break;
                    }
                };

            summary.order_pages += 1;
            counter!("backfill_pages_total", "resource" => "orders").increment(1);

            for payload in &page.body.orders {
                // Embedded customers are get-or-created, never updated:
                // historical orders must not clobber fresher customer rows.
                let customer_id = match &payload.customer {
                    Some(embedded) => Some(
                        customers
                            .get_or_create(tenant.id, &CustomerRecord::from_embedded(embedded))
                            .await?
                            .id,
                    ),
                    None => None,
                };

                let (order, _) = orders
                    .upsert(tenant.id, &OrderRecord::from_payload(payload, customer_id))
                    .await?;
                summary.orders_upserted += 1;

                for item in &payload.line_items {
                    let Some(variant_id) = item.variant_id else {
                        summary.line_items_skipped += 1;
                        continue;
                    };

                    // Unlike the live order webhook, a variant missing from
                    // the local catalog is skipped here: backfill tolerates
                    // partial catalogs.
                    match products.find_by_variant_id(tenant.id, variant_id).await? {
                        Some(product) => {
                            orders
                                .upsert_item(
                                    order.id,
                                    product.id,
                                    item.quantity.unwrap_or(1),
                                    item.price,
                                )
                                .await?;
                        }
                        None => {
                            debug!(
                                shop = %tenant.shopify_domain,
                                order_id = payload.id,
                                variant_id,
                                "Skipping line item for unknown variant"
                            );
                            counter!("backfill_line_items_skipped_total").increment(1);
                            summary.line_items_skipped += 1;
                        }
                    }
                }
            }

            url = page.next_url;
            if url.is_some() {
                sleep(Duration::from_millis(self.config.page_delay_ms)).await;
            }
        }

        Ok(())
    }
}

fn log_walk_end(shop: &str, resource: &str, err: &ShopifyClientError) {
    warn!(
        shop,
        resource,
        error = %err,
        "Backfill walk terminated early"
    );
    counter!("backfill_walk_failures_total", "resource" => resource.to_string()).increment(1);
}

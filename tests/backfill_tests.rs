//! Backfill engine integration tests.
//!
//! Runs the engine against a wiremock Shopify and an in-memory database,
//! covering Link-header pagination termination, variant fan-out
//! idempotency, tolerant order ingestion, and per-resource walk isolation.

use sea_orm::EntityTrait;
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shoplytics::models::{customer, order, order_item, product};
use shoplytics::shopify::ShopifyClient;
use shoplytics::sync::BackfillEngine;

mod test_utils;
use test_utils::{create_test_tenant, setup_test_db, test_config};

const SHOP: &str = "testshop.myshopify.com";

fn engine_for(server: &MockServer) -> BackfillEngine {
    let config = test_config();
    let client = ShopifyClient::new(&config).with_shop_base(server.uri());
    BackfillEngine::new(client, config.backfill)
}

fn products_path() -> &'static str {
    "/admin/api/2024-07/products.json"
}

fn customers_path() -> &'static str {
    "/admin/api/2024-07/customers.json"
}

fn orders_path() -> &'static str {
    "/admin/api/2024-07/orders.json"
}

async fn mount_empty(server: &MockServer, endpoint: &str, envelope_key: &str) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ envelope_key: [] })))
        .mount(server)
        .await;
}

fn product_with_variants(id: i64, title: &str, variants: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "body_html": "<p>desc</p>",
        "created_at": "2024-01-10T00:00:00Z",
        "updated_at": "2024-01-11T00:00:00Z",
        "variants": variants
    })
}

#[tokio::test]
async fn test_pagination_walk_performs_exactly_n_fetches() {
    let mock_server = MockServer::start().await;

    let next_url = format!(
        "{}{}?limit=2&page_info=page2",
        mock_server.uri(),
        products_path()
    );

    // Page 1 carries a rel="next" link; page 2 does not, ending the walk.
    Mock::given(method("GET"))
        .and(path(products_path()))
        .and(query_param_is_missing("page_info"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Link",
                    format!("<{}>; rel=\"next\"", next_url).as_str(),
                )
                .set_body_json(json!({
                    "products": [
                        product_with_variants(1, "One", json!([{"id": 11, "title": "A", "price": "10.00"}])),
                        product_with_variants(2, "Two", json!([{"id": 21, "title": "A", "price": "20.00"}]))
                    ]
                })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(products_path()))
        .and(query_param("page_info", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [
                product_with_variants(3, "Three", json!([{"id": 31, "title": "A", "price": "30.00"}]))
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_empty(&mock_server, customers_path(), "customers").await;
    mount_empty(&mock_server, orders_path(), "orders").await;

    let db = setup_test_db().await.unwrap();
    let (_, tenant) = create_test_tenant(&db, SHOP).await.unwrap();

    let summary = engine_for(&mock_server)
        .sync(&db, &tenant, "test-token")
        .await
        .unwrap();

    assert_eq!(summary.product_pages, 2);
    assert_eq!(summary.products_upserted, 3);

    let rows = product::Entity::find().all(&db).await.unwrap();
    assert_eq!(rows.len(), 3);

    // expect(1) on both mocks verifies no third fetch happened
    mock_server.verify().await;
}

#[tokio::test]
async fn test_variant_fan_out_is_idempotent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(products_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [product_with_variants(100, "Shirt", json!([
                {"id": 1001, "title": "S", "price": "15.00", "sku": "SH-S", "inventory_quantity": 4},
                {"id": 1002, "title": "M", "price": "15.00", "sku": "SH-M", "inventory_quantity": 6},
                {"id": 1003, "title": "L", "price": "16.50", "sku": "SH-L", "inventory_quantity": 2}
            ]))]
        })))
        .mount(&mock_server)
        .await;
    mount_empty(&mock_server, customers_path(), "customers").await;
    mount_empty(&mock_server, orders_path(), "orders").await;

    let db = setup_test_db().await.unwrap();
    let (_, tenant) = create_test_tenant(&db, SHOP).await.unwrap();
    let engine = engine_for(&mock_server);

    let first = engine.sync(&db, &tenant, "test-token").await.unwrap();
    assert_eq!(first.products_upserted, 3);

    let rows = product::Entity::find().all(&db).await.unwrap();
    assert_eq!(rows.len(), 3);
    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert!(titles.contains(&"Shirt - S"));
    assert!(titles.contains(&"Shirt - M"));
    assert!(titles.contains(&"Shirt - L"));

    // Replaying the identical catalog leaves exactly three rows
    engine.sync(&db, &tenant, "test-token").await.unwrap();
    assert_eq!(product::Entity::find().all(&db).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_order_backfill_tolerates_unknown_variants() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(products_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [product_with_variants(200, "Mug", json!([
                {"id": 871, "title": "Standard", "price": "9.99"}
            ]))]
        })))
        .mount(&mock_server)
        .await;
    mount_empty(&mock_server, customers_path(), "customers").await;

    Mock::given(method("GET"))
        .and(path(orders_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": [{
                "id": 5001,
                "total_price": "29.97",
                "currency": "USD",
                "financial_status": "paid",
                "created_at": "2024-04-01T12:00:00Z",
                "updated_at": "2024-04-01T12:00:00Z",
                "customer": {
                    "id": 42,
                    "first_name": "Stale",
                    "email": "stale@example.com"
                },
                "line_items": [
                    {"variant_id": 871, "quantity": 2, "price": "9.99"},
                    {"variant_id": 999, "quantity": 1, "price": "9.99"}
                ]
            }]
        })))
        .mount(&mock_server)
        .await;

    let db = setup_test_db().await.unwrap();
    let (_, tenant) = create_test_tenant(&db, SHOP).await.unwrap();

    // Customer 42 already exists with fresher data than the order embeds
    use shoplytics::repositories::CustomerRepository;
    use shoplytics::repositories::customer::CustomerRecord;
    use shoplytics::shopify::types::ShopifyCustomer;
    let fresh: ShopifyCustomer = serde_json::from_value(json!({
        "id": 42,
        "first_name": "Fresh",
        "email": "fresh@example.com"
    }))
    .unwrap();
    CustomerRepository::new(&db)
        .upsert(tenant.id, &CustomerRecord::from_profile(&fresh))
        .await
        .unwrap();

    let summary = engine_for(&mock_server)
        .sync(&db, &tenant, "test-token")
        .await
        .unwrap();

    // Order persisted with only the matched item; the unknown variant was
    // skipped rather than aborting anything
    assert_eq!(summary.orders_upserted, 1);
    assert_eq!(summary.line_items_skipped, 1);

    let orders = order::Entity::find().all(&db).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].shopify_order_id, 5001);

    let items = order_item::Entity::find().all(&db).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);

    // get-or-create: the backfilled order did not clobber the fresher row
    let customers = customer::Entity::find().all(&db).await.unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].email.as_deref(), Some("fresh@example.com"));
    assert_eq!(orders[0].customer_id, Some(customers[0].id));
}

#[tokio::test]
async fn test_failed_walk_does_not_stop_later_resources() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(products_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(customers_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "customers": [{
                "id": 7,
                "first_name": "Grace",
                "last_name": "Hopper",
                "email": "grace@example.com",
                "created_at": "2024-02-01T00:00:00Z",
                "updated_at": "2024-02-02T00:00:00Z",
                "default_address": {"phone": "555-0007", "city": "Arlington"}
            }]
        })))
        .mount(&mock_server)
        .await;
    mount_empty(&mock_server, orders_path(), "orders").await;

    let db = setup_test_db().await.unwrap();
    let (_, tenant) = create_test_tenant(&db, SHOP).await.unwrap();

    // The products failure is swallowed; the sync still returns Ok
    let summary = engine_for(&mock_server)
        .sync(&db, &tenant, "test-token")
        .await
        .unwrap();

    assert_eq!(summary.product_pages, 0);
    assert_eq!(summary.products_upserted, 0);
    assert_eq!(summary.customers_upserted, 1);

    let customers = customer::Entity::find().all(&db).await.unwrap();
    assert_eq!(customers.len(), 1);
    // Phone fell back to the default address
    assert_eq!(customers[0].phone.as_deref(), Some("555-0007"));
    assert_eq!(customers[0].city.as_deref(), Some("Arlington"));
}

#[tokio::test]
async fn test_customer_backfill_is_idempotent() {
    let mock_server = MockServer::start().await;

    mount_empty(&mock_server, products_path(), "products").await;
    Mock::given(method("GET"))
        .and(path(customers_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "customers": [{
                "id": 8,
                "first_name": "Alan",
                "email": "alan@example.com",
                "created_at": "2024-02-01T00:00:00Z",
                "updated_at": "2024-02-02T00:00:00Z"
            }]
        })))
        .mount(&mock_server)
        .await;
    mount_empty(&mock_server, orders_path(), "orders").await;

    let db = setup_test_db().await.unwrap();
    let (_, tenant) = create_test_tenant(&db, SHOP).await.unwrap();
    let engine = engine_for(&mock_server);

    engine.sync(&db, &tenant, "test-token").await.unwrap();
    engine.sync(&db, &tenant, "test-token").await.unwrap();

    let customers = customer::Entity::find().all(&db).await.unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].email.as_deref(), Some("alan@example.com"));
}

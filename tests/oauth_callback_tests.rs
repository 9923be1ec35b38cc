//! OAuth handshake integration tests.
//!
//! Drives `/auth/shopify` and `/auth/shopify/callback` through the full
//! router against a wiremock Shopify, covering HMAC rejection, token
//! exchange failure, tenant creation, token rotation, and the two
//! fire-and-forget job submissions.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use sea_orm::EntityTrait;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shoplytics::crypto;
use shoplytics::jobs::SyncJob;
use shoplytics::models::{tenant, user};
use shoplytics::server::create_app;
use shoplytics::shopify::oauth::compute_callback_digest;

mod test_utils;
use test_utils::{body_text, setup_test_app};

const SHOP: &str = "testshop.myshopify.com";

fn signed_callback_query(code: &str, secret: &str) -> String {
    let params = vec![
        ("shop".to_string(), SHOP.to_string()),
        ("code".to_string(), code.to_string()),
        ("timestamp".to_string(), "1700000000".to_string()),
    ];
    let hmac = compute_callback_digest(&params, secret);

    format!(
        "shop={}&code={}&timestamp=1700000000&hmac={}",
        SHOP, code, hmac
    )
}

async fn mount_happy_shopify(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/admin/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "shpat_test_token",
            "scope": "read_products,read_orders,read_customers"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/api/2024-07/shop.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "shop": {
                "email": "ada@testshop.example",
                "shop_owner": "Ada Lovelace",
                "name": "Test Shop"
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_begin_redirects_to_authorize_url() {
    let app = setup_test_app(None).await.unwrap();
    let router = create_app(app.state);

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/auth/shopify?shop={}", SHOP))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with(&format!("https://{}/admin/oauth/authorize?", SHOP)));
    assert!(location.contains("client_id=test-api-key"));
    assert!(location.contains("scope=read_products,read_orders,read_customers"));
    assert!(location.contains("redirect_uri=http://app.test/auth/shopify/callback"));
}

#[tokio::test]
async fn test_begin_missing_shop_renders_error_page() {
    let app = setup_test_app(None).await.unwrap();
    let router = create_app(app.state);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/auth/shopify")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert!(body.contains("Missing shop parameter."));
}

#[tokio::test]
async fn test_callback_completes_handshake() {
    let mock_server = MockServer::start().await;
    mount_happy_shopify(&mock_server).await;

    let app = setup_test_app(Some(mock_server.uri())).await.unwrap();
    let db = app.state.db.clone();
    let sessions = app.state.sessions.clone();
    let router = create_app(app.state);

    let query = signed_callback_query("authcode123", "test-api-secret");
    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/auth/shopify/callback?{}", query))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with("http://frontend.test?session="));

    // The redirect carries a live session for the created user
    let session_token = location.split("session=").nth(1).unwrap();
    assert!(sessions.resolve(session_token).is_some());

    // User resolved from the shop profile, owner name split at first space
    let users = user::Entity::find().all(&db).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "ada@testshop.example");
    assert_eq!(users[0].first_name.as_deref(), Some("Ada"));
    assert_eq!(users[0].last_name.as_deref(), Some("Lovelace"));
    assert!(users[0].password_hash.starts_with('!'));

    // Tenant row keyed by domain, token recoverable only with the key
    let tenants = tenant::Entity::find().all(&db).await.unwrap();
    assert_eq!(tenants.len(), 1);
    assert_eq!(tenants[0].shopify_domain, SHOP);
    assert_eq!(tenants[0].name, "testshop");
    let token = crypto::open_access_token(
        Some(&[0u8; 32]),
        SHOP,
        &tenants[0].access_token_ciphertext,
    )
    .unwrap();
    assert_eq!(token, "shpat_test_token");

    // Both jobs submitted, keyed only by tenant id
    let jobs = app.jobs.jobs();
    assert_eq!(
        jobs,
        vec![
            SyncJob::SubscribeWebhooks {
                tenant_id: tenants[0].id
            },
            SyncJob::BackfillStore {
                tenant_id: tenants[0].id
            },
        ]
    );
}

#[tokio::test]
async fn test_callback_rejects_invalid_hmac_without_mutating() {
    let mock_server = MockServer::start().await;
    mount_happy_shopify(&mock_server).await;

    let app = setup_test_app(Some(mock_server.uri())).await.unwrap();
    let db = app.state.db.clone();
    let router = create_app(app.state);

    // Sign with the right secret, then tamper with the shop parameter
    let query = signed_callback_query("authcode123", "test-api-secret")
        .replace("testshop", "evilshop");

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/auth/shopify/callback?{}", query))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert!(body.contains("Invalid HMAC."));

    // Security failure leaves no partial state and schedules nothing
    assert!(tenant::Entity::find().all(&db).await.unwrap().is_empty());
    assert!(user::Entity::find().all(&db).await.unwrap().is_empty());
    assert!(app.jobs.jobs().is_empty());
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_callback_wrong_secret_rejected() {
    let app = setup_test_app(None).await.unwrap();
    let db = app.state.db.clone();
    let router = create_app(app.state);

    let query = signed_callback_query("authcode123", "some-other-secret");
    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/auth/shopify/callback?{}", query))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(tenant::Entity::find().all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_callback_token_exchange_failure_persists_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/oauth/access_token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid code"))
        .mount(&mock_server)
        .await;

    let app = setup_test_app(Some(mock_server.uri())).await.unwrap();
    let db = app.state.db.clone();
    let router = create_app(app.state);

    let query = signed_callback_query("expiredcode", "test-api-secret");
    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/auth/shopify/callback?{}", query))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_text(response).await;
    assert!(body.contains("Failed to get access token."));

    assert!(tenant::Entity::find().all(&db).await.unwrap().is_empty());
    assert!(user::Entity::find().all(&db).await.unwrap().is_empty());
    assert!(app.jobs.jobs().is_empty());
}

#[tokio::test]
async fn test_callback_reauth_rotates_token_in_place() {
    let mock_server = MockServer::start().await;
    mount_happy_shopify(&mock_server).await;

    let app = setup_test_app(Some(mock_server.uri())).await.unwrap();
    let db = app.state.db.clone();
    let router = create_app(app.state);

    for code in ["first-code", "second-code"] {
        let query = signed_callback_query(code, "test-api-secret");
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/auth/shopify/callback?{}", query))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    // Re-auth updates, never duplicates
    let tenants = tenant::Entity::find().all(&db).await.unwrap();
    assert_eq!(tenants.len(), 1);
    let users = user::Entity::find().all(&db).await.unwrap();
    assert_eq!(users.len(), 1);

    // Two handshakes, two pairs of job submissions
    assert_eq!(app.jobs.jobs().len(), 4);
}

//! # Server Configuration
//!
//! This module contains the server setup and configuration for the Shoplytics API.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::SessionStore;
use crate::config::AppConfig;
use crate::handlers;
use crate::jobs::{JobQueue, TokioJobQueue};
use crate::shopify::ShopifyClient;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub shopify: ShopifyClient,
    pub jobs: Arc<dyn JobQueue>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Assemble production state: Tokio-backed job queue, fresh session store.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let config = Arc::new(config);
        let shopify = ShopifyClient::new(&config);
        let jobs: Arc<dyn JobQueue> = Arc::new(TokioJobQueue::new(
            db.clone(),
            Arc::clone(&config),
            shopify.clone(),
        ));
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(
            config.session_ttl_seconds,
        )));

        Self {
            config,
            db,
            shopify,
            jobs,
            sessions,
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/auth/shopify", get(handlers::oauth::begin))
        .route("/auth/shopify/callback", get(handlers::oauth::callback))
        .route("/api/customers/", post(handlers::webhooks::create_customer))
        .route("/api/products/", post(handlers::webhooks::create_product))
        .route("/api/orders/", post(handlers::webhooks::create_order))
        .route(
            "/api/custom-events/",
            post(handlers::webhooks::create_custom_event),
        )
        .route("/api/dashboard/stats", get(handlers::dashboard::stats))
        .route(
            "/api/dashboard/orders-by-date",
            get(handlers::dashboard::orders_by_date),
        )
        .route(
            "/api/dashboard/top-customers",
            get(handlers::dashboard::top_customers),
        )
        .layer(axum::middleware::from_fn(
            crate::telemetry::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(config, db);

    // Expired dashboard sessions are dropped lazily on access; this sweep
    // keeps the store from accumulating tokens nobody touches again.
    let sessions = Arc::clone(&state.sessions);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            sessions.purge_expired();
        }
    });

    let addr = state
        .config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = state.config.profile.clone();

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Add the bearer session scheme referenced by the dashboard paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::webhooks::create_customer,
        crate::handlers::webhooks::create_product,
        crate::handlers::webhooks::create_order,
        crate::handlers::webhooks::create_custom_event,
        crate::handlers::dashboard::stats,
        crate::handlers::dashboard::orders_by_date,
        crate::handlers::dashboard::top_customers,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::dashboard::DashboardStats,
            crate::repositories::order::OrdersByDateRow,
            crate::repositories::order::TopCustomerRow,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Shoplytics API",
        description = "Multi-tenant Shopify analytics backend",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

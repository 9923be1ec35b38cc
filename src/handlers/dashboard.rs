//! # Dashboard Read Handlers
//!
//! Tenant-scoped aggregates over the ingested data: headline stats,
//! per-day order counts, and the top customers by spend. All three resolve
//! the caller's tenant from the session user and reject users without one.

use axum::extract::{Json, Query, State};
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::CurrentUser;
use crate::error::{ApiError, forbidden};
use crate::models::tenant;
use crate::repositories::order::{OrdersByDateRow, TopCustomerRow};
use crate::repositories::{CustomerRepository, OrderRepository, TenantRepository};
use crate::server::AppState;

const TOP_CUSTOMER_LIMIT: u64 = 5;
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Headline dashboard figures.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_customers: u64,
    pub total_orders: u64,
    #[schema(value_type = String)]
    pub total_revenue: Decimal,
}

/// Optional date window for the orders-by-date series.
#[derive(Debug, Deserialize, IntoParams)]
pub struct DateWindowQuery {
    /// Window start (YYYY-MM-DD); defaults to 30 days ago
    pub start_date: Option<NaiveDate>,
    /// Window end (YYYY-MM-DD); defaults to today
    pub end_date: Option<NaiveDate>,
}

async fn tenant_for_user(state: &AppState, user: CurrentUser) -> Result<tenant::Model, ApiError> {
    TenantRepository::new(&state.db)
        .find_by_user(user.0)
        .await?
        .ok_or_else(|| forbidden(Some("No tenant associated with this user")))
}

/// Headline stats for the caller's tenant.
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Aggregate stats", body = DashboardStats),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 403, description = "User owns no tenant", body = ApiError)
    ),
    tag = "dashboard"
)]
pub async fn stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<DashboardStats>, ApiError> {
    let tenant = tenant_for_user(&state, user).await?;

    let total_customers = CustomerRepository::new(&state.db)
        .count_by_tenant(tenant.id)
        .await?;
    let orders = OrderRepository::new(&state.db);
    let total_orders = orders.count_by_tenant(tenant.id).await?;
    let total_revenue = orders.total_revenue(tenant.id).await?;

    Ok(Json(DashboardStats {
        total_customers,
        total_orders,
        total_revenue,
    }))
}

/// Per-day order counts over the requested window.
#[utoipa::path(
    get,
    path = "/api/dashboard/orders-by-date",
    security(("bearer_auth" = [])),
    params(DateWindowQuery),
    responses(
        (status = 200, description = "Ordered day buckets", body = [OrdersByDateRow]),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 403, description = "User owns no tenant", body = ApiError)
    ),
    tag = "dashboard"
)]
pub async fn orders_by_date(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(window): Query<DateWindowQuery>,
) -> Result<Json<Vec<OrdersByDateRow>>, ApiError> {
    let tenant = tenant_for_user(&state, user).await?;

    let end_date = window.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start_date = window
        .start_date
        .unwrap_or_else(|| end_date - Duration::days(DEFAULT_WINDOW_DAYS));

    let rows = OrderRepository::new(&state.db)
        .counts_by_date(tenant.id, start_date, end_date)
        .await?;

    Ok(Json(rows))
}

/// Top customers by summed order total.
#[utoipa::path(
    get,
    path = "/api/dashboard/top-customers",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Up to five customers, highest spend first", body = [TopCustomerRow]),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 403, description = "User owns no tenant", body = ApiError)
    ),
    tag = "dashboard"
)]
pub async fn top_customers(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<TopCustomerRow>>, ApiError> {
    let tenant = tenant_for_user(&state, user).await?;

    let rows = OrderRepository::new(&state.db)
        .top_customers(tenant.id, TOP_CUSTOMER_LIMIT)
        .await?;

    Ok(Json(rows))
}

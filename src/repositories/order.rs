//! # Order Repository
//!
//! Order and line-item upserts plus the dashboard aggregates. Orders key on
//! (tenant_id, shopify_order_id); line items key on (order_id, product_id)
//! so a replayed order payload updates its lines in place.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::models::order::{self, ActiveModel, Entity, Model};
use crate::models::order_item::{
    self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity, Model as OrderItemModel,
};
use crate::shopify::types::ShopifyOrder;

/// Flattened order fields ready for an upsert.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub shopify_order_id: i64,
    pub customer_id: Option<Uuid>,
    pub total_price: Decimal,
    pub currency: String,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderRecord {
    /// Map an order payload, with the locally resolved customer reference.
    pub fn from_payload(payload: &ShopifyOrder, customer_id: Option<Uuid>) -> Self {
        Self {
            shopify_order_id: payload.id,
            customer_id,
            total_price: payload.total_price,
            currency: payload.currency.clone().unwrap_or_else(|| "USD".to_string()),
            financial_status: payload.financial_status.clone(),
            fulfillment_status: payload.fulfillment_status.clone(),
            created_at: payload.created_at,
            updated_at: payload.updated_at,
        }
    }
}

/// One bucket of the orders-by-date dashboard series.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, serde::Serialize, utoipa::ToSchema)]
pub struct OrdersByDateRow {
    pub date: NaiveDate,
    pub order_count: i64,
}

/// One row of the top-customers dashboard ranking.
#[derive(Debug, Clone, FromQueryResult, serde::Serialize, utoipa::ToSchema)]
pub struct TopCustomerRow {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[schema(value_type = Option<String>)]
    pub total_spent: Option<Decimal>,
}

/// Repository for Order database operations
pub struct OrderRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> OrderRepository<'a, C> {
    /// Create a new OrderRepository with the given connection
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Find an order by its natural key
    pub async fn find_by_shopify_id(
        &self,
        tenant_id: Uuid,
        shopify_order_id: i64,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(order::Column::TenantId.eq(tenant_id))
            .filter(order::Column::ShopifyOrderId.eq(shopify_order_id))
            .one(self.db)
            .await
    }

    /// Upsert an order on (tenant, shopify_order_id).
    pub async fn upsert(
        &self,
        tenant_id: Uuid,
        record: &OrderRecord,
    ) -> Result<(Model, bool), sea_orm::DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let created_at: DateTimeWithTimeZone =
            record.created_at.map(Into::into).unwrap_or(now);
        let updated_at: DateTimeWithTimeZone =
            record.updated_at.map(Into::into).unwrap_or(now);

        if let Some(existing) = self
            .find_by_shopify_id(tenant_id, record.shopify_order_id)
            .await?
        {
            let mut active = existing.into_active_model();
            active.customer_id = Set(record.customer_id);
            active.total_price = Set(record.total_price);
            active.currency = Set(record.currency.clone());
            active.financial_status = Set(record.financial_status.clone());
            active.fulfillment_status = Set(record.fulfillment_status.clone());
            active.created_at = Set(created_at);
            active.updated_at = Set(updated_at);
            let updated = active.update(self.db).await?;
            return Ok((updated, false));
        }

        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            shopify_order_id: Set(record.shopify_order_id),
            customer_id: Set(record.customer_id),
            total_price: Set(record.total_price),
            currency: Set(record.currency.clone()),
            financial_status: Set(record.financial_status.clone()),
            fulfillment_status: Set(record.fulfillment_status.clone()),
            created_at: Set(created_at),
            updated_at: Set(updated_at),
        };

        let inserted = model.insert(self.db).await?;
        Ok((inserted, true))
    }

    /// Upsert a line item on (order_id, product_id).
    pub async fn upsert_item(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        price: Decimal,
    ) -> Result<OrderItemModel, sea_orm::DbErr> {
        let existing = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .filter(order_item::Column::ProductId.eq(product_id))
            .one(self.db)
            .await?;

        if let Some(existing) = existing {
            let mut active = existing.into_active_model();
            active.quantity = Set(quantity);
            active.price = Set(price);
            return active.update(self.db).await;
        }

        let item = OrderItemActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(Some(product_id)),
            quantity: Set(quantity),
            price: Set(price),
        };

        item.insert(self.db).await
    }

    /// List the line items of an order
    pub async fn list_items(&self, order_id: Uuid) -> Result<Vec<OrderItemModel>, sea_orm::DbErr> {
        OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(self.db)
            .await
    }

    /// Count orders for a tenant
    pub async fn count_by_tenant(&self, tenant_id: Uuid) -> Result<u64, sea_orm::DbErr> {
        Entity::find()
            .filter(order::Column::TenantId.eq(tenant_id))
            .count(self.db)
            .await
    }

    /// Sum of order totals for a tenant (zero when there are no orders)
    pub async fn total_revenue(&self, tenant_id: Uuid) -> Result<Decimal, sea_orm::DbErr> {
        #[derive(FromQueryResult)]
        struct RevenueRow {
            total_revenue: Option<Decimal>,
        }

        let row = Entity::find()
            .select_only()
            .column_as(order::Column::TotalPrice.sum(), "total_revenue")
            .filter(order::Column::TenantId.eq(tenant_id))
            .into_model::<RevenueRow>()
            .one(self.db)
            .await?;

        Ok(row.and_then(|r| r.total_revenue).unwrap_or(Decimal::ZERO))
    }

    /// Per-day order counts over a closed date window, ordered by date.
    pub async fn counts_by_date(
        &self,
        tenant_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OrdersByDateRow>, sea_orm::DbErr> {
        let window_end: DateTimeWithTimeZone = end_date
            .succ_opt()
            .unwrap_or(end_date)
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc()
            .into();
        let window_start: DateTimeWithTimeZone = start_date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc()
            .into();

        Entity::find()
            .select_only()
            .column_as(Expr::cust("DATE(created_at)"), "date")
            .column_as(order::Column::Id.count(), "order_count")
            .filter(order::Column::TenantId.eq(tenant_id))
            .filter(order::Column::CreatedAt.gte(window_start))
            .filter(order::Column::CreatedAt.lt(window_end))
            .group_by(Expr::cust("DATE(created_at)"))
            .order_by_asc(Expr::cust("DATE(created_at)"))
            .into_model::<OrdersByDateRow>()
            .all(self.db)
            .await
    }

    /// Top customers by summed order total, highest spend first.
    pub async fn top_customers(
        &self,
        tenant_id: Uuid,
        limit: u64,
    ) -> Result<Vec<TopCustomerRow>, sea_orm::DbErr> {
        use crate::models::customer;
        use sea_orm::{JoinType, RelationTrait};

        customer::Entity::find()
            .select_only()
            .column(customer::Column::FirstName)
            .column(customer::Column::LastName)
            .column(customer::Column::Email)
            .column_as(order::Column::TotalPrice.sum(), "total_spent")
            .join(JoinType::InnerJoin, customer::Relation::Order.def())
            .filter(customer::Column::TenantId.eq(tenant_id))
            .group_by(customer::Column::Id)
            .group_by(customer::Column::FirstName)
            .group_by(customer::Column::LastName)
            .group_by(customer::Column::Email)
            .order_by_desc(Expr::cust("SUM(orders.total_price)"))
            .limit(limit)
            .into_model::<TopCustomerRow>()
            .all(self.db)
            .await
    }
}

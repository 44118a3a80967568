use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use kasira_order::{
    Order, OrderItem, OrderRepository, OrderStatus, OrderSummary, SalesReport, StatusFilter,
};

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    subtotal: i64,
    tax: i64,
    grandtotal: i64,
    status: String,
    external_transaction_id: Option<String>,
    payment_method_id: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    price: i64,
    quantity: i32,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    status: String,
    grandtotal: i64,
    total_items: i64,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ReportRow {
    total_revenue: i64,
    total_ongoing_order: i64,
    total_completed_orders: i64,
}

impl OrderRow {
    fn into_order(
        self,
        items: Vec<OrderItem>,
    ) -> Result<Order, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Order {
            id: self.id,
            subtotal: self.subtotal,
            tax: self.tax,
            grandtotal: self.grandtotal,
            status: self.status.parse::<OrderStatus>()?,
            external_transaction_id: self.external_transaction_id,
            payment_method_id: self.payment_method_id,
            paid_at: self.paid_at,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, subtotal, tax, grandtotal, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id)
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.grandtotal)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, product_name, price, quantity, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.price)
            .bind(item.quantity)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, subtotal, tax, grandtotal, status, external_transaction_id, payment_method_id, paid_at, created_at, updated_at FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, product_name, price, quantity, created_at FROM order_items WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .into_iter()
            .map(|item| OrderItem {
                id: item.id,
                order_id: item.order_id,
                product_id: item.product_id,
                product_name: item.product_name,
                price: item.price,
                quantity: item.quantity,
                created_at: item.created_at,
            })
            .collect();

        Ok(Some(row.into_order(items)?))
    }

    async fn set_payment_correlation(
        &self,
        id: Uuid,
        external_transaction_id: &str,
        payment_method_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "UPDATE orders SET external_transaction_id = $1, payment_method_id = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(external_transaction_id)
        .bind(payment_method_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_paid(
        &self,
        id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        // CAS on paid_at: concurrent confirmations race safely, first wins
        let result = sqlx::query(
            "UPDATE orders SET paid_at = $1, status = 'PROCESSING', updated_at = NOW() WHERE id = $2 AND paid_at IS NULL",
        )
        .bind(paid_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn finish_order(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        // CAS on status: at most one concurrent finisher sees PROCESSING
        let result = sqlx::query(
            "UPDATE orders SET status = 'DONE', updated_at = NOW() WHERE id = $1 AND status = 'PROCESSING'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_order(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Items go with it via ON DELETE CASCADE
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_orders(
        &self,
        filter: StatusFilter,
    ) -> Result<Vec<OrderSummary>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = match filter {
            StatusFilter::All => {
                sqlx::query_as::<_, SummaryRow>(
                    r#"
                    SELECT o.id, o.status, o.grandtotal, COALESCE(SUM(i.quantity), 0)::BIGINT AS total_items, o.created_at
                    FROM orders o
                    LEFT JOIN order_items i ON i.order_id = o.id
                    GROUP BY o.id
                    ORDER BY o.created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
            StatusFilter::Only(status) => {
                sqlx::query_as::<_, SummaryRow>(
                    r#"
                    SELECT o.id, o.status, o.grandtotal, COALESCE(SUM(i.quantity), 0)::BIGINT AS total_items, o.created_at
                    FROM orders o
                    LEFT JOIN order_items i ON i.order_id = o.id
                    WHERE o.status = $1
                    GROUP BY o.id
                    ORDER BY o.created_at DESC
                    "#,
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            summaries.push(OrderSummary {
                id: row.id,
                status: row.status.parse::<OrderStatus>()?,
                grandtotal: row.grandtotal,
                total_items: row.total_items,
                created_at: row.created_at,
            });
        }
        Ok(summaries)
    }

    async fn sales_report(
        &self,
    ) -> Result<SalesReport, Box<dyn std::error::Error + Send + Sync>> {
        // One statement so all three aggregates come from the same snapshot
        let row = sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT
                COALESCE(SUM(grandtotal) FILTER (WHERE paid_at IS NOT NULL), 0)::BIGINT AS total_revenue,
                COUNT(*) FILTER (WHERE status <> 'DONE') AS total_ongoing_order,
                COUNT(*) FILTER (WHERE status = 'DONE') AS total_completed_orders
            FROM orders
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesReport {
            total_revenue: row.total_revenue,
            total_ongoing_order: row.total_ongoing_order,
            total_completed_orders: row.total_completed_orders,
        })
    }
}

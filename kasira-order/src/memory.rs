use async_trait::async_trait;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use kasira_catalog::{Catalog, Product};

use crate::models::{Order, OrderStatus, OrderSummary, SalesReport, StatusFilter};
use crate::repository::OrderRepository;

/// In-memory order store for tests and dev mode. All mutations run under
/// one lock, which gives the same serialization the Postgres repository
/// gets from row-level CAS updates.
pub struct MemoryOrderRepository {
    orders: Mutex<HashMap<Uuid, Order>>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut orders = self.orders.lock().await;
        if orders.contains_key(&order.id) {
            return Err(format!("Order already exists: {}", order.id).into());
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.orders.lock().await.get(&id).cloned())
    }

    async fn set_payment_correlation(
        &self,
        id: Uuid,
        external_transaction_id: &str,
        payment_method_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut orders = self.orders.lock().await;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| format!("Order not found: {}", id))?;
        order.external_transaction_id = Some(external_transaction_id.to_string());
        order.payment_method_id = Some(payment_method_id.to_string());
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_paid(
        &self,
        id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut orders = self.orders.lock().await;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| format!("Order not found: {}", id))?;

        if order.paid_at.is_some() {
            return Ok(false);
        }

        order.paid_at = Some(paid_at);
        order.status = OrderStatus::Processing;
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn finish_order(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut orders = self.orders.lock().await;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| format!("Order not found: {}", id))?;

        if order.status != OrderStatus::Processing {
            return Ok(false);
        }

        order.status = OrderStatus::Done;
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_order(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.orders.lock().await.remove(&id);
        Ok(())
    }

    async fn list_orders(
        &self,
        filter: StatusFilter,
    ) -> Result<Vec<OrderSummary>, Box<dyn std::error::Error + Send + Sync>> {
        let orders = self.orders.lock().await;

        let mut summaries: Vec<OrderSummary> = orders
            .values()
            .filter(|order| filter.matches(order.status))
            .map(|order| OrderSummary {
                id: order.id,
                status: order.status,
                grandtotal: order.grandtotal,
                total_items: order.total_items(),
                created_at: order.created_at,
            })
            .collect();

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn sales_report(
        &self,
    ) -> Result<SalesReport, Box<dyn std::error::Error + Send + Sync>> {
        let orders = self.orders.lock().await;

        // Single pass under the lock so all three numbers agree
        let mut report = SalesReport {
            total_revenue: 0,
            total_ongoing_order: 0,
            total_completed_orders: 0,
        };

        for order in orders.values() {
            if order.paid_at.is_some() {
                report.total_revenue += order.grandtotal;
            }
            if order.status == OrderStatus::Done {
                report.total_completed_orders += 1;
            } else {
                report.total_ongoing_order += 1;
            }
        }

        Ok(report)
    }
}

/// In-memory product catalog, seeded by tests and dev bootstrap
pub struct MemoryCatalog {
    products: Mutex<HashMap<Uuid, Product>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            products: Mutex::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, product: Product) {
        self.products.lock().await.insert(product.id, product);
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn products_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, Box<dyn std::error::Error + Send + Sync>> {
        let products = self.products.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| products.get(id).cloned())
            .collect())
    }

    async fn list_products(
        &self,
    ) -> Result<Vec<Product>, Box<dyn std::error::Error + Send + Sync>> {
        let products = self.products.lock().await;
        let mut all: Vec<Product> = products.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}

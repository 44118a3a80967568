use std::sync::Arc;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use kasira_catalog::{price_order, Catalog, LineItem, PricingError};
use kasira_core::payment::PaymentStatus;

use crate::models::{Order, OrderStatus, OrderSummary, SalesReport, StatusFilter};
use crate::orchestrator::PaymentOrchestrator;
use crate::repository::OrderRepository;

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order is not processable: {0}")]
    Unprocessable(&'static str),

    #[error("Product not found in catalog: {0}")]
    UnknownProduct(Uuid),

    #[error("Payment gateway failure: {0}")]
    Gateway(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<PricingError> for OrderError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::UnknownProduct(id) => OrderError::UnknownProduct(id),
            other => OrderError::Validation(other.to_string()),
        }
    }
}

fn storage(err: Box<dyn std::error::Error + Send + Sync>) -> OrderError {
    OrderError::Storage(err.to_string())
}

/// A freshly created order together with the QR payload the client renders
#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    pub order: Order,
    pub qr_string: String,
}

/// Owns order state transitions and their preconditions
pub struct OrderManager {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn Catalog>,
    payments: PaymentOrchestrator,
}

impl OrderManager {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn Catalog>,
        payments: PaymentOrchestrator,
    ) -> Self {
        Self {
            orders,
            catalog,
            payments,
        }
    }

    /// Checkout: price the cart against the catalog, persist the order with
    /// its items, then create the payment request and attach the provider
    /// ids. A failure after persistence deletes the order again so no
    /// partially initialized order survives.
    pub async fn create_order(&self, lines: Vec<LineItem>) -> Result<Checkout, OrderError> {
        let mut ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
        ids.sort();
        ids.dedup();

        let products = self.catalog.products_by_ids(&ids).await.map_err(storage)?;
        let quote = price_order(&lines, &products)?;

        let mut order = Order::from_quote(quote);
        self.orders.create_order(&order).await.map_err(storage)?;

        let payment = match self.payments.create_payment(order.id, order.grandtotal).await {
            Ok(payment) => payment,
            Err(err) => {
                tracing::warn!("Payment request failed for order {}: {}", order.id, err);
                self.rollback_creation(order.id).await;
                return Err(OrderError::Gateway(err.to_string()));
            }
        };

        if let Err(err) = self
            .orders
            .set_payment_correlation(order.id, &payment.external_id, &payment.payment_method_id)
            .await
        {
            self.rollback_creation(order.id).await;
            return Err(OrderError::Storage(err.to_string()));
        }

        order.external_transaction_id = Some(payment.external_id);
        order.payment_method_id = Some(payment.payment_method_id);

        tracing::info!(
            "Order {} created, grandtotal {} awaiting payment",
            order.id,
            order.grandtotal
        );

        Ok(Checkout {
            order,
            qr_string: payment.qr_string,
        })
    }

    async fn rollback_creation(&self, order_id: Uuid) {
        if let Err(err) = self.orders.delete_order(order_id).await {
            // The operator has to clean this row up by hand
            tracing::error!("Rollback of order {} failed: {}", order_id, err);
        }
    }

    /// Payment confirmation from the webhook or the sandbox simulate path.
    /// Idempotent: confirming an already-paid order changes nothing.
    pub async fn confirm_payment(&self, order_id: Uuid) -> Result<(), OrderError> {
        self.require_order(order_id).await?;

        let confirmed = self
            .orders
            .mark_paid(order_id, Utc::now())
            .await
            .map_err(storage)?;

        if confirmed {
            tracing::info!("Order {} paid, now processing", order_id);
        }
        Ok(())
    }

    /// Operator action: complete a paid, processing order. Deliberately not
    /// idempotent; the second caller is told the order is no longer
    /// processing.
    pub async fn finish_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let order = self.require_order(order_id).await?;

        if !order.is_paid() {
            return Err(OrderError::Unprocessable("not paid yet"));
        }
        if order.status != OrderStatus::Processing {
            return Err(OrderError::Unprocessable("not processing yet"));
        }

        let won = self.orders.finish_order(order_id).await.map_err(storage)?;
        if !won {
            // Lost the race to a concurrent finisher
            return Err(OrderError::Unprocessable("not processing yet"));
        }

        tracing::info!("Order {} finished", order_id);
        self.require_order(order_id).await
    }

    /// Client polling read: has the payment landed yet?
    pub async fn check_order_status(&self, order_id: Uuid) -> Result<bool, OrderError> {
        let order = self.require_order(order_id).await?;
        Ok(order.is_paid())
    }

    /// Sandbox aid: settle the order's payment request on the provider side
    /// and run the confirmation path, as the provider emits no callback for
    /// simulated payments.
    pub async fn simulate_payment(&self, order_id: Uuid) -> Result<(), OrderError> {
        let order = self.require_order(order_id).await?;

        let payment_method_id = order
            .payment_method_id
            .as_deref()
            .ok_or(OrderError::Unprocessable("no payment request"))?;

        self.payments
            .simulate(payment_method_id, order.grandtotal)
            .await
            .map_err(|err| OrderError::Gateway(err.to_string()))?;

        self.confirm_payment(order_id).await
    }

    /// Poll the provider for an order's payment and confirm it if it
    /// settled without us seeing the webhook
    pub async fn reconcile_payment(&self, order_id: Uuid) -> Result<PaymentStatus, OrderError> {
        let order = self.require_order(order_id).await?;

        let external_id = order
            .external_transaction_id
            .as_deref()
            .ok_or(OrderError::Unprocessable("no payment request"))?;

        let status = self
            .payments
            .payment_status(external_id)
            .await
            .map_err(|err| OrderError::Gateway(err.to_string()))?;

        if status == PaymentStatus::Paid {
            self.confirm_payment(order_id).await?;
        }
        Ok(status)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.require_order(order_id).await
    }

    pub async fn list_orders(
        &self,
        filter: StatusFilter,
    ) -> Result<Vec<OrderSummary>, OrderError> {
        self.orders.list_orders(filter).await.map_err(storage)
    }

    pub async fn sales_report(&self) -> Result<SalesReport, OrderError> {
        self.orders.sales_report().await.map_err(storage)
    }

    async fn require_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .get_order(order_id)
            .await
            .map_err(storage)?
            .ok_or(OrderError::NotFound(order_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCatalog, MemoryOrderRepository};
    use crate::orchestrator::MockGateway;
    use kasira_catalog::Product;
    use kasira_core::payment::PaymentGateway;

    struct Fixture {
        manager: Arc<OrderManager>,
        orders: Arc<MemoryOrderRepository>,
        gateway: Arc<MockGateway>,
        es_teh: Uuid,
        nasi_goreng: Uuid,
    }

    async fn fixture() -> Fixture {
        fixture_with_gateway(MockGateway::new()).await
    }

    async fn fixture_with_gateway(gateway: MockGateway) -> Fixture {
        let gateway = Arc::new(gateway);
        let orders = Arc::new(MemoryOrderRepository::new());
        let catalog = Arc::new(MemoryCatalog::new());

        let es_teh = Uuid::new_v4();
        let nasi_goreng = Uuid::new_v4();
        catalog
            .insert(Product {
                id: es_teh,
                name: "Es Teh".to_string(),
                price: 10_000,
                category_id: Uuid::new_v4(),
                image_url: None,
                is_active: true,
            })
            .await;
        catalog
            .insert(Product {
                id: nasi_goreng,
                name: "Nasi Goreng".to_string(),
                price: 25_000,
                category_id: Uuid::new_v4(),
                image_url: None,
                is_active: true,
            })
            .await;

        let manager = Arc::new(OrderManager::new(
            orders.clone(),
            catalog,
            PaymentOrchestrator::new(gateway.clone()),
        ));

        Fixture {
            manager,
            orders,
            gateway,
            es_teh,
            nasi_goreng,
        }
    }

    fn line(product_id: Uuid, quantity: i32) -> LineItem {
        LineItem {
            product_id,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_create_order_totals_and_correlation() {
        let fx = fixture().await;

        let checkout = fx
            .manager
            .create_order(vec![line(fx.es_teh, 2)])
            .await
            .unwrap();

        assert_eq!(checkout.order.subtotal, 20_000);
        assert_eq!(checkout.order.tax, 2_000);
        assert_eq!(checkout.order.grandtotal, 22_000);
        assert_eq!(checkout.order.status, OrderStatus::AwaitingPayment);
        assert!(checkout.order.external_transaction_id.is_some());
        assert!(checkout.order.payment_method_id.is_some());
        assert!(!checkout.qr_string.is_empty());

        // Persisted copy carries the correlation ids too
        let stored = fx
            .orders
            .get_order(checkout.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.external_transaction_id,
            checkout.order.external_transaction_id
        );
        assert_eq!(stored.items.len(), 1);
    }

    #[tokio::test]
    async fn test_create_order_unknown_product_rejected() {
        let fx = fixture().await;
        let missing = Uuid::new_v4();

        let result = fx
            .manager
            .create_order(vec![line(fx.es_teh, 1), line(missing, 1)])
            .await;

        assert!(matches!(result, Err(OrderError::UnknownProduct(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_create_order_invalid_quantity_rejected() {
        let fx = fixture().await;

        let result = fx.manager.create_order(vec![line(fx.es_teh, 0)]).await;
        assert!(matches!(result, Err(OrderError::Validation(_))));
    }

    #[tokio::test]
    async fn test_gateway_failure_rolls_back_creation() {
        let fx = fixture_with_gateway(MockGateway::failing()).await;

        let result = fx.manager.create_order(vec![line(fx.es_teh, 1)]).await;
        assert!(matches!(result, Err(OrderError::Gateway(_))));

        // Nothing half-created is left behind
        let summaries = fx.orders.list_orders(StatusFilter::All).await.unwrap();
        assert!(summaries.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_payment_is_idempotent() {
        let fx = fixture().await;
        let checkout = fx
            .manager
            .create_order(vec![line(fx.es_teh, 1)])
            .await
            .unwrap();
        let order_id = checkout.order.id;

        fx.manager.confirm_payment(order_id).await.unwrap();
        let first = fx.orders.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(first.status, OrderStatus::Processing);
        let first_paid_at = first.paid_at.unwrap();

        // Second confirmation is a no-op, timestamp untouched
        fx.manager.confirm_payment(order_id).await.unwrap();
        let second = fx.orders.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(second.status, OrderStatus::Processing);
        assert_eq!(second.paid_at.unwrap(), first_paid_at);
    }

    #[tokio::test]
    async fn test_check_order_status_tracks_payment() {
        let fx = fixture().await;
        let checkout = fx
            .manager
            .create_order(vec![line(fx.es_teh, 1)])
            .await
            .unwrap();
        let order_id = checkout.order.id;

        assert!(!fx.manager.check_order_status(order_id).await.unwrap());

        fx.manager.simulate_payment(order_id).await.unwrap();
        assert!(fx.manager.check_order_status(order_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_finish_requires_payment_first() {
        let fx = fixture().await;
        let checkout = fx
            .manager
            .create_order(vec![line(fx.es_teh, 1)])
            .await
            .unwrap();

        let result = fx.manager.finish_order(checkout.order.id).await;
        assert!(matches!(
            result,
            Err(OrderError::Unprocessable("not paid yet"))
        ));
    }

    #[tokio::test]
    async fn test_finish_happy_path_then_rejects_second_call() {
        let fx = fixture().await;
        let checkout = fx
            .manager
            .create_order(vec![line(fx.nasi_goreng, 2)])
            .await
            .unwrap();
        let order_id = checkout.order.id;

        fx.manager.simulate_payment(order_id).await.unwrap();

        let finished = fx.manager.finish_order(order_id).await.unwrap();
        assert_eq!(finished.status, OrderStatus::Done);

        // Completion is one-shot
        let again = fx.manager.finish_order(order_id).await;
        assert!(matches!(
            again,
            Err(OrderError::Unprocessable("not processing yet"))
        ));
    }

    #[tokio::test]
    async fn test_finish_unknown_order() {
        let fx = fixture().await;
        let result = fx.manager.finish_order(Uuid::new_v4()).await;
        assert!(matches!(result, Err(OrderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_finishers_have_one_winner() {
        let fx = fixture().await;
        let checkout = fx
            .manager
            .create_order(vec![line(fx.es_teh, 1)])
            .await
            .unwrap();
        let order_id = checkout.order.id;
        fx.manager.simulate_payment(order_id).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = fx.manager.clone();
            handles.push(tokio::spawn(async move {
                manager.finish_order(order_id).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);

        let stored = fx.orders.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Done);
    }

    #[tokio::test]
    async fn test_reconcile_confirms_settled_payment() {
        let fx = fixture().await;
        let checkout = fx
            .manager
            .create_order(vec![line(fx.es_teh, 1)])
            .await
            .unwrap();
        let order_id = checkout.order.id;

        // Provider settles without us receiving the webhook
        let status = fx.manager.reconcile_payment(order_id).await.unwrap();
        assert_eq!(status, PaymentStatus::Pending);

        fx.gateway
            .simulate_payment(checkout.order.payment_method_id.as_deref().unwrap(), 11_000)
            .await
            .unwrap();

        let status = fx.manager.reconcile_payment(order_id).await.unwrap();
        assert_eq!(status, PaymentStatus::Paid);
        assert!(fx.manager.check_order_status(order_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_orders_filtering() {
        let fx = fixture().await;

        let awaiting = fx
            .manager
            .create_order(vec![line(fx.es_teh, 1)])
            .await
            .unwrap();
        let processing = fx
            .manager
            .create_order(vec![line(fx.es_teh, 2)])
            .await
            .unwrap();
        let done = fx
            .manager
            .create_order(vec![line(fx.nasi_goreng, 1)])
            .await
            .unwrap();

        fx.manager.simulate_payment(processing.order.id).await.unwrap();
        fx.manager.simulate_payment(done.order.id).await.unwrap();
        fx.manager.finish_order(done.order.id).await.unwrap();

        let all = fx.manager.list_orders(StatusFilter::All).await.unwrap();
        assert_eq!(all.len(), 3);

        for status in [
            OrderStatus::AwaitingPayment,
            OrderStatus::Processing,
            OrderStatus::Done,
        ] {
            let filtered = fx
                .manager
                .list_orders(StatusFilter::Only(status))
                .await
                .unwrap();
            assert!(filtered.iter().all(|summary| summary.status == status));
            // Every filtered order appears in the unfiltered listing
            assert!(filtered
                .iter()
                .all(|summary| all.iter().any(|other| other.id == summary.id)));
        }

        let only_awaiting = fx
            .manager
            .list_orders(StatusFilter::Only(OrderStatus::AwaitingPayment))
            .await
            .unwrap();
        assert_eq!(only_awaiting.len(), 1);
        assert_eq!(only_awaiting[0].id, awaiting.order.id);
        assert_eq!(only_awaiting[0].total_items, 1);
    }

    #[tokio::test]
    async fn test_sales_report_aggregates() {
        let fx = fixture().await;

        let unpaid = fx
            .manager
            .create_order(vec![line(fx.es_teh, 1)])
            .await
            .unwrap();
        let paid = fx
            .manager
            .create_order(vec![line(fx.es_teh, 2)])
            .await
            .unwrap();
        let completed = fx
            .manager
            .create_order(vec![line(fx.nasi_goreng, 1)])
            .await
            .unwrap();

        fx.manager.simulate_payment(paid.order.id).await.unwrap();
        fx.manager.simulate_payment(completed.order.id).await.unwrap();
        fx.manager.finish_order(completed.order.id).await.unwrap();

        let report = fx.manager.sales_report().await.unwrap();

        // Revenue counts paid orders only, unpaid carts contribute nothing
        assert_eq!(
            report.total_revenue,
            paid.order.grandtotal + completed.order.grandtotal
        );
        assert_eq!(report.total_completed_orders, 1);
        assert_eq!(report.total_ongoing_order, 2);

        // Ongoing + completed covers every order exactly once
        let all = fx.manager.list_orders(StatusFilter::All).await.unwrap();
        assert_eq!(
            report.total_ongoing_order + report.total_completed_orders,
            all.len() as i64
        );
        let _ = unpaid;
    }
}

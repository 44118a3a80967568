use async_trait::async_trait;
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::models::{Order, OrderSummary, SalesReport, StatusFilter};

/// Repository trait for order data access.
///
/// The order row is the unit of contention: `mark_paid` and `finish_order`
/// are compare-and-swap operations so concurrent callers are serialized at
/// the storage layer and at most one of them observes the transition.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist an order together with all of its items, atomically
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>>;

    /// Attach the provider's ids after the payment request is created.
    /// Called once per order, right after creation.
    async fn set_payment_correlation(
        &self,
        id: Uuid,
        external_transaction_id: &str,
        payment_method_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Set paid_at and advance AWAITING_PAYMENT -> PROCESSING, only if the
    /// order is still unpaid. Returns whether this call did the transition;
    /// false means someone already confirmed and the stored timestamp stands.
    async fn mark_paid(
        &self,
        id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Flip PROCESSING -> DONE. Returns whether this call won the flip;
    /// false for any caller that found the order in another status.
    async fn finish_order(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Remove an order and its items. Only used to compensate a creation
    /// that failed after persistence (e.g. gateway rejection).
    async fn delete_order(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Summaries newest-first, restricted by the filter
    async fn list_orders(
        &self,
        filter: StatusFilter,
    ) -> Result<Vec<OrderSummary>, Box<dyn std::error::Error + Send + Sync>>;

    /// All three aggregates from one consistent snapshot
    async fn sales_report(
        &self,
    ) -> Result<SalesReport, Box<dyn std::error::Error + Send + Sync>>;
}

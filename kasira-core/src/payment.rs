use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Provider-side status of a payment request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Failed,
}

/// A QR payment request as created with the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub external_id: String, // Provider's ID (e.g., pr_123)
    pub order_id: Uuid,
    pub payment_method_id: String,
    pub amount: i64,
    pub qr_string: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a QR payment request for the exact order amount.
    /// Implementations must key the request on the order id so a retried
    /// creation for the same order does not charge twice.
    async fn create_payment(
        &self,
        order_id: Uuid,
        amount: i64,
    ) -> Result<PaymentRequest, Box<dyn std::error::Error + Send + Sync>>;

    /// Mark a pending payment request as paid on the provider side.
    /// Sandbox aid only; the API never routes to this in production.
    async fn simulate_payment(
        &self,
        payment_method_id: &str,
        amount: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Retrieve provider-side status for a payment request
    async fn payment_status(
        &self,
        external_id: &str,
    ) -> Result<PaymentStatus, Box<dyn std::error::Error + Send + Sync>>;
}

use kasira_core::payment::{PaymentGateway, PaymentRequest, PaymentStatus};
use uuid::Uuid;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Thin seam between the order lifecycle and the configured gateway.
/// Adapter selection (live vs. sandbox) happens at wiring time.
pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentOrchestrator {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Create a payment request for the exact order grandtotal
    pub async fn create_payment(
        &self,
        order_id: Uuid,
        amount: i64,
    ) -> Result<PaymentRequest, Box<dyn std::error::Error + Send + Sync>> {
        let request = self.gateway.create_payment(order_id, amount).await?;
        tracing::info!(
            "Created payment request {} for order {}",
            request.external_id,
            order_id
        );
        Ok(request)
    }

    /// Sandbox aid: settle a pending payment request on the provider side
    pub async fn simulate(
        &self,
        payment_method_id: &str,
        amount: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.gateway.simulate_payment(payment_method_id, amount).await
    }

    /// Poll provider-side status (e.g. when reconciling a missed webhook)
    pub async fn payment_status(
        &self,
        external_id: &str,
    ) -> Result<PaymentStatus, Box<dyn std::error::Error + Send + Sync>> {
        self.gateway.payment_status(external_id).await
    }
}

/// In-process gateway for tests and dev mode. Payment requests are
/// remembered so a simulated settlement is visible to later status polls.
pub struct MockGateway {
    fail_creation: bool,
    settled: Mutex<HashSet<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            fail_creation: false,
            settled: Mutex::new(HashSet::new()),
        }
    }

    /// A gateway whose create call always fails, for outage paths
    pub fn failing() -> Self {
        Self {
            fail_creation: true,
            settled: Mutex::new(HashSet::new()),
        }
    }

    fn key_of(id: &str) -> &str {
        id.strip_prefix("mock_pr_")
            .or_else(|| id.strip_prefix("mock_pm_"))
            .unwrap_or(id)
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment(
        &self,
        order_id: Uuid,
        amount: i64,
    ) -> Result<PaymentRequest, Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_creation {
            return Err("Simulated payment gateway outage".into());
        }

        // Encode order_id in both ids so simulate and status polls line up
        Ok(PaymentRequest {
            external_id: format!("mock_pr_{}", order_id.simple()),
            order_id,
            payment_method_id: format!("mock_pm_{}", order_id.simple()),
            amount,
            qr_string: format!("00020101mock{}5802ID6304", order_id.simple()),
            status: PaymentStatus::Pending,
            created_at: chrono::Utc::now(),
        })
    }

    async fn simulate_payment(
        &self,
        payment_method_id: &str,
        _amount: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let key = Self::key_of(payment_method_id).to_string();
        self.settled.lock().unwrap().insert(key);
        Ok(())
    }

    async fn payment_status(
        &self,
        external_id: &str,
    ) -> Result<PaymentStatus, Box<dyn std::error::Error + Send + Sync>> {
        let key = Self::key_of(external_id);
        if self.settled.lock().unwrap().contains(key) {
            Ok(PaymentStatus::Paid)
        } else {
            Ok(PaymentStatus::Pending)
        }
    }
}

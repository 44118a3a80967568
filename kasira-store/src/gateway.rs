use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use kasira_core::payment::{PaymentGateway, PaymentRequest, PaymentStatus};

use crate::app_config::GatewayConfig;

/// HTTP client for the QRIS payment provider. All requests share one
/// bounded timeout; a timed-out creation is a gateway failure and the
/// caller aborts the whole order.
pub struct QrisClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl QrisClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct CreatePaymentBody {
    reference_id: String,
    amount: i64,
    currency: &'static str,
    payment_method: PaymentMethodSpec,
}

#[derive(Debug, Serialize)]
struct PaymentMethodSpec {
    #[serde(rename = "type")]
    type_: &'static str,
    reusability: &'static str,
    qr_code: QrCodeSpec,
}

#[derive(Debug, Serialize)]
struct QrCodeSpec {
    channel_code: &'static str,
}

#[derive(Debug, Deserialize)]
struct CreatedPaymentResponse {
    id: String,
    status: String,
    payment_method: PaymentMethodResponse,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodResponse {
    id: String,
    qr_code: Option<QrCodeResponse>,
}

#[derive(Debug, Deserialize)]
struct QrCodeResponse {
    channel_properties: Option<ChannelProperties>,
}

#[derive(Debug, Deserialize)]
struct ChannelProperties {
    qr_string: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
struct SimulateBody {
    amount: i64,
}

fn map_status(status: &str) -> PaymentStatus {
    match status {
        "SUCCEEDED" => PaymentStatus::Paid,
        "FAILED" | "EXPIRED" | "CANCELED" => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    }
}

#[async_trait]
impl PaymentGateway for QrisClient {
    async fn create_payment(
        &self,
        order_id: Uuid,
        amount: i64,
    ) -> Result<PaymentRequest, Box<dyn std::error::Error + Send + Sync>> {
        let body = CreatePaymentBody {
            reference_id: order_id.to_string(),
            amount,
            currency: "IDR",
            payment_method: PaymentMethodSpec {
                type_: "QR_CODE",
                reusability: "ONE_TIME_USE",
                qr_code: QrCodeSpec {
                    channel_code: "QRIS",
                },
            },
        };

        let response = self
            .http
            .post(format!("{}/payment_requests", self.base_url))
            .bearer_auth(&self.api_key)
            // The order id keys the request so a retried creation for the
            // same order resolves to the provider's original request
            .header("Idempotency-Key", order_id.to_string())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let payload: CreatedPaymentResponse = response.json().await?;

        let qr_string = payload
            .payment_method
            .qr_code
            .and_then(|qr| qr.channel_properties)
            .and_then(|props| props.qr_string)
            .ok_or("Payment request response carried no QR payload")?;

        Ok(PaymentRequest {
            external_id: payload.id,
            order_id,
            payment_method_id: payload.payment_method.id,
            amount,
            qr_string,
            status: map_status(&payload.status),
            created_at: Utc::now(),
        })
    }

    async fn simulate_payment(
        &self,
        payment_method_id: &str,
        amount: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.http
            .post(format!(
                "{}/payment_methods/{}/payments/simulate",
                self.base_url, payment_method_id
            ))
            .bearer_auth(&self.api_key)
            .json(&SimulateBody { amount })
            .send()
            .await?
            .error_for_status()?;

        tracing::info!("Simulated settlement for payment method {}", payment_method_id);
        Ok(())
    }

    async fn payment_status(
        &self,
        external_id: &str,
    ) -> Result<PaymentStatus, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .http
            .get(format!("{}/payment_requests/{}", self.base_url, external_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?;

        let payload: StatusResponse = response.json().await?;
        Ok(map_status(&payload.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status("SUCCEEDED"), PaymentStatus::Paid);
        assert_eq!(map_status("FAILED"), PaymentStatus::Failed);
        assert_eq!(map_status("EXPIRED"), PaymentStatus::Failed);
        assert_eq!(map_status("REQUIRES_ACTION"), PaymentStatus::Pending);
        assert_eq!(map_status("PENDING"), PaymentStatus::Pending);
    }
}

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use kasira_order::OrderError;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QrisWebhook {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub payment_request_id: String,
    // The order id we handed the provider at creation
    pub reference_id: String,
    pub status: Option<String>,
}

/// POST /v1/webhooks/payments/qris
/// Receive payment status updates from the QRIS provider
pub async fn handle_qris_webhook(
    State(state): State<AppState>,
    Json(payload): Json<QrisWebhook>,
) -> Result<StatusCode, StatusCode> {
    tracing::info!(
        "Received webhook: {} for payment request {}",
        payload.event,
        payload.data.payment_request_id
    );

    if payload.event == "payment.succeeded" {
        let order_id = match Uuid::parse_str(&payload.data.reference_id) {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!(
                    "Webhook reference {} is not an order id, ignoring",
                    payload.data.reference_id
                );
                return Ok(StatusCode::OK);
            }
        };

        match state.orders.confirm_payment(order_id).await {
            Ok(()) => {
                tracing::info!("Order {} confirmed paid via webhook", order_id);
            }
            Err(OrderError::NotFound(_)) => {
                // Acknowledge so the provider stops retrying a reference
                // we will never be able to resolve
                tracing::warn!("Webhook for unknown order {}", order_id);
            }
            Err(err) => {
                tracing::error!("Webhook confirmation failed for order {}: {}", order_id, err);
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    } else if payload.event == "payment.failed" {
        // The order stays AWAITING_PAYMENT; the operator can retry checkout
        tracing::warn!(
            "Payment failed for request {} (order reference {})",
            payload.data.payment_request_id,
            payload.data.reference_id
        );
    }

    Ok(StatusCode::OK)
}

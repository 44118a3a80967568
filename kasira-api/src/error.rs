use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use kasira_order::OrderError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    UnprocessableError(String),
    GatewayError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::UnprocessableError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::GatewayError(msg) => {
                tracing::error!("Payment gateway failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Payment gateway unavailable".to_string(),
                )
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(msg) => AppError::ValidationError(msg),
            OrderError::NotFound(id) => AppError::NotFoundError(format!("Order not found: {}", id)),
            OrderError::UnknownProduct(id) => {
                AppError::NotFoundError(format!("Product not found: {}", id))
            }
            OrderError::Unprocessable(reason) => AppError::UnprocessableError(reason.to_string()),
            OrderError::Gateway(msg) => AppError::GatewayError(msg),
            OrderError::Storage(msg) => AppError::InternalServerError(msg),
        }
    }
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kasira_catalog::LineItem;
use kasira_order::{Order, OrderSummary, StatusFilter};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub order_items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: Order,
    pub qr_string: String,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default = "default_status_filter")]
    pub status: String,
}

fn default_status_filter() -> String {
    "ALL".to_string()
}

#[derive(Debug, Serialize)]
pub struct OrderStatusResponse {
    pub paid: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/orders
/// Checkout: price the cart, persist the order, create the QR payment
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let lines: Vec<LineItem> = req
        .order_items
        .into_iter()
        .map(|item| LineItem {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();

    let checkout = state.orders.create_order(lines).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order: checkout.order,
            qr_string: checkout.qr_string,
        }),
    ))
}

/// GET /v1/orders?status=ALL|AWAITING_PAYMENT|PROCESSING|DONE
/// Listing for the sales dashboard
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderSummary>>, AppError> {
    let filter = StatusFilter::parse(&query.status).ok_or_else(|| {
        AppError::ValidationError(format!("Unknown status filter: {}", query.status))
    })?;

    let summaries = state.orders.list_orders(filter).await?;
    Ok(Json(summaries))
}

/// GET /v1/orders/{id}/status
/// Client polling read: has the payment landed yet?
pub async fn check_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderStatusResponse>, AppError> {
    let paid = state.orders.check_order_status(order_id).await?;
    Ok(Json(OrderStatusResponse { paid }))
}

/// POST /v1/orders/{id}/finish
/// Operator action: complete a paid, processing order
pub async fn finish_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders.finish_order(order_id).await?;
    Ok(Json(order))
}

/// POST /v1/orders/{id}/simulate-payment
/// Sandbox only; the router never exposes this in production
pub async fn simulate_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.orders.simulate_payment(order_id).await?;
    Ok(StatusCode::OK)
}

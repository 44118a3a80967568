use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use kasira_catalog::Quote;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    AwaitingPayment,
    Processing,
    Done,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "AWAITING_PAYMENT",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Done => "DONE",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWAITING_PAYMENT" => Ok(OrderStatus::AwaitingPayment),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "DONE" => Ok(OrderStatus::Done),
            other => Err(format!("Unknown order status: {}", other)),
        }
    }
}

/// Listing filter: everything, or one exact status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn parse(s: &str) -> Option<StatusFilter> {
        if s == "ALL" {
            return Some(StatusFilter::All);
        }
        s.parse::<OrderStatus>().ok().map(StatusFilter::Only)
    }

    pub fn matches(&self, status: OrderStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

/// The aggregate root for a purchase. Monetary fields are computed once at
/// creation and never change; paid_at and the payment correlation ids are
/// written exactly once by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub subtotal: i64,
    pub tax: i64,
    pub grandtotal: i64,
    pub status: OrderStatus,
    pub external_transaction_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a new order from a priced quote, status AWAITING_PAYMENT
    pub fn from_quote(quote: Quote) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let items = quote
            .items
            .into_iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                order_id: id,
                product_id: item.product_id,
                product_name: item.product_name,
                price: item.price,
                quantity: item.quantity,
                created_at: now,
            })
            .collect();

        Self {
            id,
            subtotal: quote.subtotal,
            tax: quote.tax,
            grandtotal: quote.grandtotal,
            status: OrderStatus::AwaitingPayment,
            external_transaction_id: None,
            payment_method_id: None,
            paid_at: None,
            items,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    /// Total units across all lines, for listing cards
    pub fn total_items(&self) -> i64 {
        self.items.iter().map(|item| item.quantity as i64).sum()
    }
}

/// A product line inside an order. The unit price is a snapshot taken at
/// order creation, decoupled from later catalog changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// Listing view: one order with its aggregate item count, no line detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub status: OrderStatus,
    pub grandtotal: i64,
    pub total_items: i64,
    pub created_at: DateTime<Utc>,
}

/// Dashboard aggregates over all persisted orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesReport {
    pub total_revenue: i64,
    pub total_ongoing_order: i64,
    pub total_completed_orders: i64,
}

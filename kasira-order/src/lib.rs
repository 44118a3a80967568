pub mod models;
pub mod repository;
pub mod manager;
pub mod orchestrator;
pub mod memory;

pub use models::{Order, OrderItem, OrderStatus, OrderSummary, SalesReport, StatusFilter};
pub use manager::{Checkout, OrderError, OrderManager};
pub use orchestrator::{MockGateway, PaymentOrchestrator};
pub use repository::OrderRepository;
pub use memory::{MemoryCatalog, MemoryOrderRepository};

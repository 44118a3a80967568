use std::sync::Arc;
use kasira_catalog::Catalog;
use kasira_order::OrderManager;

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderManager>,
    pub catalog: Arc<dyn Catalog>,
    // Mirrors gateway.sandbox; gates the simulate-payment route
    pub sandbox: bool,
}

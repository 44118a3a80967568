use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod orders;
pub mod products;
pub mod reports;
pub mod state;
pub mod webhooks;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let mut router = Router::new()
        .route(
            "/v1/orders",
            post(orders::create_order).get(orders::list_orders),
        )
        .route("/v1/orders/{id}/status", get(orders::check_order_status))
        .route("/v1/orders/{id}/finish", post(orders::finish_order))
        .route("/v1/products", get(products::list_products))
        .route("/v1/reports/sales", get(reports::get_sales_report))
        .route(
            "/v1/webhooks/payments/qris",
            post(webhooks::handle_qris_webhook),
        );

    // Settling payments without the provider only exists in sandbox
    if state.sandbox {
        router = router.route(
            "/v1/orders/{id}/simulate-payment",
            post(orders::simulate_payment),
        );
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

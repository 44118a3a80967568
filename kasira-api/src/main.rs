use std::net::SocketAddr;
use std::sync::Arc;

use kasira_api::{app, AppState};
use kasira_order::{OrderManager, PaymentOrchestrator};
use kasira_store::{DbClient, PgCatalog, PgOrderRepository, QrisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kasira_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = kasira_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Kasira API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let gateway = QrisClient::new(&config.gateway).expect("Failed to build gateway client");
    if config.gateway.sandbox {
        tracing::warn!("Gateway sandbox mode is ON, simulate-payment is routable");
    }

    let order_repo = Arc::new(PgOrderRepository::new(db.pool.clone()));
    let catalog = Arc::new(PgCatalog::new(db.pool.clone()));

    let manager = Arc::new(OrderManager::new(
        order_repo,
        catalog.clone(),
        PaymentOrchestrator::new(Arc::new(gateway)),
    ));

    let app_state = AppState {
        orders: manager,
        catalog,
        sandbox: config.gateway.sandbox,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

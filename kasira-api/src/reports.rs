use axum::{extract::State, Json};

use kasira_order::SalesReport;

use crate::error::AppError;
use crate::state::AppState;

/// GET /v1/reports/sales
/// Dashboard aggregates: revenue, ongoing and completed order counts
pub async fn get_sales_report(
    State(state): State<AppState>,
) -> Result<Json<SalesReport>, AppError> {
    let report = state.orders.sales_report().await?;
    Ok(Json(report))
}

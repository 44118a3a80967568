use axum::{extract::State, Json};

use kasira_catalog::Product;

use crate::error::AppError;
use crate::state::AppState;

/// GET /v1/products
/// Read-only catalog listing for the cart page
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = state
        .catalog
        .list_products()
        .await
        .map_err(|err| AppError::Anyhow(anyhow::anyhow!(err)))?;

    Ok(Json(products))
}

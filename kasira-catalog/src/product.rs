use serde::{Deserialize, Serialize};
use uuid::Uuid;
use async_trait::async_trait;

/// A catalog product. Prices are whole-rupiah amounts; orders capture the
/// price at creation time and never reread the catalog afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub category_id: Uuid,
    pub image_url: Option<String>,
    pub is_active: bool,
}

/// Read-side catalog access used by checkout
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Bulk fetch by id set. Unknown ids are simply absent from the result;
    /// callers decide what a missing record means.
    async fn products_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_products(
        &self,
    ) -> Result<Vec<Product>, Box<dyn std::error::Error + Send + Sync>>;
}

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use kasira_catalog::{Catalog, Product};

pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: i64,
    category_id: Uuid,
    image_url: Option<String>,
    is_active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            category_id: row.category_id,
            image_url: row.image_url,
            is_active: row.is_active,
        }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn products_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, category_id, image_url, is_active FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn list_products(
        &self,
    ) -> Result<Vec<Product>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, category_id, image_url, is_active FROM products WHERE is_active ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }
}

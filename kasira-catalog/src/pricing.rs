use serde::{Deserialize, Serialize};
use uuid::Uuid;
use std::collections::HashMap;

use crate::product::Product;

/// Tax applied to every order, in basis points of the subtotal
pub const TAX_RATE_BPS: i64 = 1_000;

/// A requested line as submitted by the client cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A line after resolution against the catalog, with the unit price
/// captured for the lifetime of the order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub price: i64,
    pub quantity: i32,
}

/// Totals for an order at creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub subtotal: i64,
    pub tax: i64,
    pub grandtotal: i64,
    pub items: Vec<PricedItem>,
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Order has no line items")]
    EmptyOrder,

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: Uuid, quantity: i32 },

    #[error("Product not found in catalog: {0}")]
    UnknownProduct(Uuid),
}

/// Price the requested lines against the catalog records fetched for them.
/// Pure over its inputs; no catalog access happens here.
///
/// Duplicate lines for the same product merge by summing quantities. A
/// requested product with no catalog record rejects the whole quote.
pub fn price_order(requests: &[LineItem], products: &[Product]) -> Result<Quote, PricingError> {
    if requests.is_empty() {
        return Err(PricingError::EmptyOrder);
    }

    let mut quantities: HashMap<Uuid, i32> = HashMap::new();
    let mut seen_order: Vec<Uuid> = Vec::new();

    for line in requests {
        if line.quantity < 1 {
            return Err(PricingError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        let entry = quantities.entry(line.product_id).or_insert(0);
        if *entry == 0 {
            seen_order.push(line.product_id);
        }
        *entry += line.quantity;
    }

    let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut items = Vec::with_capacity(seen_order.len());
    let mut subtotal: i64 = 0;

    for product_id in seen_order {
        let product = by_id
            .get(&product_id)
            .ok_or(PricingError::UnknownProduct(product_id))?;
        let quantity = quantities[&product_id];

        subtotal += product.price * quantity as i64;
        items.push(PricedItem {
            product_id,
            product_name: product.name.clone(),
            price: product.price,
            quantity,
        });
    }

    let tax = subtotal * TAX_RATE_BPS / 10_000;

    Ok(Quote {
        subtotal,
        tax,
        grandtotal: subtotal + tax,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: Uuid, name: &str, price: i64) -> Product {
        Product {
            id,
            name: name.to_string(),
            price,
            category_id: Uuid::new_v4(),
            image_url: None,
            is_active: true,
        }
    }

    #[test]
    fn test_totals_for_single_product() {
        let p1 = Uuid::new_v4();
        let quote = price_order(
            &[LineItem { product_id: p1, quantity: 2 }],
            &[product(p1, "Es Teh", 10_000)],
        )
        .unwrap();

        assert_eq!(quote.subtotal, 20_000);
        assert_eq!(quote.tax, 2_000);
        assert_eq!(quote.grandtotal, 22_000);
        assert_eq!(quote.items.len(), 1);
        assert_eq!(quote.items[0].price, 10_000);
    }

    #[test]
    fn test_subtotal_sums_all_lines() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let quote = price_order(
            &[
                LineItem { product_id: p1, quantity: 3 },
                LineItem { product_id: p2, quantity: 1 },
            ],
            &[product(p1, "Nasi Goreng", 25_000), product(p2, "Kopi", 15_000)],
        )
        .unwrap();

        assert_eq!(quote.subtotal, 90_000);
        assert_eq!(quote.grandtotal, quote.subtotal + quote.tax);
    }

    #[test]
    fn test_duplicate_lines_merge() {
        let p1 = Uuid::new_v4();
        let quote = price_order(
            &[
                LineItem { product_id: p1, quantity: 1 },
                LineItem { product_id: p1, quantity: 2 },
            ],
            &[product(p1, "Es Teh", 10_000)],
        )
        .unwrap();

        assert_eq!(quote.items.len(), 1);
        assert_eq!(quote.items[0].quantity, 3);
        assert_eq!(quote.subtotal, 30_000);
    }

    #[test]
    fn test_unknown_product_rejects_whole_quote() {
        let p1 = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let result = price_order(
            &[
                LineItem { product_id: p1, quantity: 1 },
                LineItem { product_id: missing, quantity: 1 },
            ],
            &[product(p1, "Es Teh", 10_000)],
        );

        assert!(matches!(result, Err(PricingError::UnknownProduct(id)) if id == missing));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let p1 = Uuid::new_v4();
        let result = price_order(
            &[LineItem { product_id: p1, quantity: 0 }],
            &[product(p1, "Es Teh", 10_000)],
        );

        assert!(matches!(result, Err(PricingError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_empty_order_rejected() {
        let result = price_order(&[], &[]);
        assert!(matches!(result, Err(PricingError::EmptyOrder)));
    }
}

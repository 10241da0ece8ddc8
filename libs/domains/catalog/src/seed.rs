//! Reference data for local environments and demos.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::CatalogResult;
use crate::models::NewProduct;
use crate::repository::CatalogRepository;

const CATEGORIES: [&str; 4] = ["Healthcare", "Education", "Communication", "Technology"];

/// (name, sku, price in cents, category)
const PRODUCTS: [(&str, &str, i64, &str); 3] = [
    ("Product A", "SKU001", 1099, "Healthcare"),
    ("Product B", "SKU002", 1999, "Education"),
    ("Product C", "SKU003", 1549, "Communication"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub products_created: usize,
    pub products_skipped: usize,
}

/// Create the reference categories and products.
///
/// Categories are matched by name and products by SKU, so running it again
/// creates nothing new.
pub async fn populate_products<R: CatalogRepository + ?Sized>(
    repository: &R,
) -> CatalogResult<SeedReport> {
    let mut report = SeedReport::default();
    let mut category_ids = HashMap::new();

    for name in CATEGORIES {
        let (category, created) = repository.get_or_create_category(name).await?;
        if created {
            report.categories_created += 1;
        }
        category_ids.insert(name, category.id);
    }

    for (name, sku, cents, category) in PRODUCTS {
        if repository.find_product_by_sku(sku).await?.is_some() {
            tracing::info!(sku, "Product already exists, skipping");
            report.products_skipped += 1;
            continue;
        }
        // Every product names one of CATEGORIES.
        let Some(&category_id) = category_ids.get(category) else {
            continue;
        };

        let product = repository
            .insert_product(NewProduct::new(
                name,
                sku,
                Decimal::new(cents, 2),
                category_id,
            ))
            .await?;
        tracing::info!(product_id = product.id, sku, category, "Seeded product");
        report.products_created += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ProductCriteria, ProductOrdering};
    use crate::repository::{InMemoryCatalogRepository, PageWindow};

    #[tokio::test]
    async fn test_populate_creates_reference_data() {
        let repo = InMemoryCatalogRepository::new();

        let report = populate_products(&repo).await.unwrap();

        assert_eq!(
            report,
            SeedReport {
                categories_created: 4,
                products_created: 3,
                products_skipped: 0,
            }
        );

        let products = repo
            .filter_products(
                &ProductCriteria::default(),
                &ProductOrdering::default(),
                PageWindow {
                    offset: 0,
                    limit: 10,
                },
            )
            .await
            .unwrap();
        let prices: Vec<String> = products.iter().map(|p| p.price.to_string()).collect();
        assert_eq!(prices, vec!["10.99", "19.99", "15.49"]);
    }

    #[tokio::test]
    async fn test_populate_is_idempotent() {
        let repo = InMemoryCatalogRepository::new();
        populate_products(&repo).await.unwrap();

        let report = populate_products(&repo).await.unwrap();

        assert_eq!(
            report,
            SeedReport {
                categories_created: 0,
                products_created: 0,
                products_skipped: 3,
            }
        );
        assert_eq!(
            repo.count_products(&ProductCriteria::default()).await.unwrap(),
            3
        );
    }
}

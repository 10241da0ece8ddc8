use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{Category, NewProduct, Product};
use crate::query::{ProductCriteria, ProductOrdering};

/// Offset/limit slice of an ordered result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

/// Repository trait for Category and Product persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_category(&self, name: &str) -> CatalogResult<Category>;

    /// Returns the category and whether it was created by this call
    async fn get_or_create_category(&self, name: &str) -> CatalogResult<(Category, bool)>;

    async fn get_category(&self, id: i64) -> CatalogResult<Option<Category>>;

    /// Deletes the category together with its products
    async fn delete_category(&self, id: i64) -> CatalogResult<bool>;

    async fn insert_product(&self, product: NewProduct) -> CatalogResult<Product>;

    /// Insert all products or none of them
    async fn insert_products(&self, products: Vec<NewProduct>) -> CatalogResult<Vec<Product>>;

    async fn get_product(&self, id: i64) -> CatalogResult<Option<Product>>;

    async fn find_product_by_sku(&self, sku: &str) -> CatalogResult<Option<Product>>;

    /// Filter, order, then slice
    async fn filter_products(
        &self,
        criteria: &ProductCriteria,
        ordering: &ProductOrdering,
        window: PageWindow,
    ) -> CatalogResult<Vec<Product>>;

    async fn count_products(&self, criteria: &ProductCriteria) -> CatalogResult<u64>;

    /// Replace every field of an existing product
    async fn update_product(&self, product: Product) -> CatalogResult<Product>;

    async fn delete_product(&self, id: i64) -> CatalogResult<bool>;
}

#[derive(Debug, Default)]
struct Store {
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, Product>,
    last_category_id: i64,
    last_product_id: i64,
}

impl Store {
    fn check_product(&self, product: &NewProduct, id: Option<i64>) -> CatalogResult<()> {
        if !self.categories.contains_key(&product.category) {
            return Err(CatalogError::CategoryNotFound(product.category));
        }
        let taken = self
            .products
            .values()
            .any(|p| p.sku == product.sku && Some(p.id) != id);
        if taken {
            return Err(CatalogError::DuplicateSku(product.sku.clone()));
        }
        Ok(())
    }

    fn add_category(&mut self, name: &str) -> Category {
        self.last_category_id += 1;
        let category = Category {
            id: self.last_category_id,
            name: name.to_string(),
        };
        self.categories.insert(category.id, category.clone());
        category
    }

    fn insert(&mut self, product: NewProduct) -> CatalogResult<Product> {
        self.check_product(&product, None)?;

        self.last_product_id += 1;
        let product = Product {
            id: self.last_product_id,
            name: product.name,
            sku: product.sku,
            price: product.price,
            category: product.category,
        };
        self.products.insert(product.id, product.clone());
        Ok(product)
    }
}

/// In-memory implementation of CatalogRepository (for development/testing)
///
/// Enforces the same constraints as the database schema: unique SKUs, an
/// existing category per product and cascading category deletes.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalogRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn create_category(&self, name: &str) -> CatalogResult<Category> {
        let category = self.store.write().await.add_category(name);

        tracing::info!(category_id = category.id, name, "Created category");
        Ok(category)
    }

    async fn get_or_create_category(&self, name: &str) -> CatalogResult<(Category, bool)> {
        // Lookup and insert share one guard so concurrent callers agree on a row.
        let mut store = self.store.write().await;
        if let Some(category) = store.categories.values().find(|c| c.name == name) {
            return Ok((category.clone(), false));
        }
        let category = store.add_category(name);
        drop(store);

        tracing::info!(category_id = category.id, name, "Created category");
        Ok((category, true))
    }

    async fn get_category(&self, id: i64) -> CatalogResult<Option<Category>> {
        let store = self.store.read().await;
        Ok(store.categories.get(&id).cloned())
    }

    async fn delete_category(&self, id: i64) -> CatalogResult<bool> {
        let mut store = self.store.write().await;

        if store.categories.remove(&id).is_none() {
            return Ok(false);
        }
        store.products.retain(|_, p| p.category != id);

        tracing::info!(category_id = id, "Deleted category");
        Ok(true)
    }

    async fn insert_product(&self, product: NewProduct) -> CatalogResult<Product> {
        let mut store = self.store.write().await;
        let product = store.insert(product)?;

        tracing::info!(product_id = product.id, sku = %product.sku, "Created product");
        Ok(product)
    }

    async fn insert_products(&self, products: Vec<NewProduct>) -> CatalogResult<Vec<Product>> {
        let mut store = self.store.write().await;

        // Work on a copy so a failure part-way leaves the store untouched.
        let mut staged = Store {
            categories: store.categories.clone(),
            products: store.products.clone(),
            last_category_id: store.last_category_id,
            last_product_id: store.last_product_id,
        };
        let created = products
            .into_iter()
            .map(|product| staged.insert(product))
            .collect::<CatalogResult<Vec<_>>>()?;
        *store = staged;

        tracing::info!(count = created.len(), "Created products");
        Ok(created)
    }

    async fn get_product(&self, id: i64) -> CatalogResult<Option<Product>> {
        let store = self.store.read().await;
        Ok(store.products.get(&id).cloned())
    }

    async fn find_product_by_sku(&self, sku: &str) -> CatalogResult<Option<Product>> {
        let store = self.store.read().await;
        Ok(store.products.values().find(|p| p.sku == sku).cloned())
    }

    async fn filter_products(
        &self,
        criteria: &ProductCriteria,
        ordering: &ProductOrdering,
        window: PageWindow,
    ) -> CatalogResult<Vec<Product>> {
        let store = self.store.read().await;

        let mut result: Vec<Product> = store
            .products
            .values()
            .filter(|p| criteria.matches(p))
            .cloned()
            .collect();
        result.sort_by(|a, b| ordering.compare(a, b));

        Ok(result
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .collect())
    }

    async fn count_products(&self, criteria: &ProductCriteria) -> CatalogResult<u64> {
        let store = self.store.read().await;
        Ok(store.products.values().filter(|p| criteria.matches(p)).count() as u64)
    }

    async fn update_product(&self, product: Product) -> CatalogResult<Product> {
        let mut store = self.store.write().await;

        if !store.products.contains_key(&product.id) {
            return Err(CatalogError::ProductNotFound(product.id));
        }
        let candidate = NewProduct {
            name: product.name.clone(),
            sku: product.sku.clone(),
            price: product.price,
            category: product.category,
        };
        store.check_product(&candidate, Some(product.id))?;
        store.products.insert(product.id, product.clone());

        tracing::info!(product_id = product.id, "Updated product");
        Ok(product)
    }

    async fn delete_product(&self, id: i64) -> CatalogResult<bool> {
        let mut store = self.store.write().await;

        if store.products.remove(&id).is_some() {
            tracing::info!(product_id = id, "Deleted product");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{
    BulkFailure, CatalogError, CatalogResult, FieldErrors, ItemError, SKU_TAKEN, category_missing,
    field_error, product_missing,
};
use crate::models::{NewProduct, Product};
use crate::pagination::{Page, PageLinks, PagePosition, PaginationConfig};
use crate::payload::{self, Mode};
use crate::query::ProductQuery;
use crate::repository::CatalogRepository;

/// Outcome of checking one bulk item: `Err` holds its field errors, while
/// store failures abort the whole request through the outer `CatalogResult`.
type ItemOutcome<T> = CatalogResult<Result<T, FieldErrors>>;

/// Service layer for the product list and bulk endpoints
pub struct ProductService<R: CatalogRepository> {
    repository: Arc<R>,
    pagination: PaginationConfig,
}

impl<R: CatalogRepository> ProductService<R> {
    pub fn new(repository: R) -> Self {
        Self::with_pagination(repository, PaginationConfig::default())
    }

    pub fn with_pagination(repository: R, pagination: PaginationConfig) -> Self {
        Self {
            repository: Arc::new(repository),
            pagination,
        }
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Parse decoded query-string pairs with this service's page size policy.
    pub fn parse_query(&self, pairs: &[(String, String)]) -> CatalogResult<ProductQuery> {
        ProductQuery::from_pairs(pairs, &self.pagination)
    }

    /// Count the matches, resolve the page, then fetch only that slice.
    pub async fn list_products(
        &self,
        query: &ProductQuery,
        links: &PageLinks,
    ) -> CatalogResult<Page<Product>> {
        let count = self.repository.count_products(&query.criteria).await?;
        let position = PagePosition::resolve(query.page, count, query.page_size)?;

        let results = if count == 0 {
            Vec::new()
        } else {
            self.repository
                .filter_products(&query.criteria, &query.ordering, position.window())
                .await?
        };

        Ok(links.page(position, count, results))
    }

    pub async fn get_product(&self, id: i64) -> CatalogResult<Product> {
        self.repository
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))
    }

    /// Validate every item, then insert all of them in one atomic write.
    ///
    /// Any invalid item rejects the whole batch and nothing is stored.
    pub async fn bulk_create(&self, items: Vec<Value>) -> CatalogResult<Vec<Product>> {
        let total = items.len();
        let mut known_categories = HashMap::new();
        let mut batch_skus = HashSet::new();
        let mut errors = Vec::new();
        let mut valid = Vec::with_capacity(total);

        for (index, item) in items.iter().enumerate() {
            match self
                .check_new_product(item, &mut known_categories, &mut batch_skus)
                .await?
            {
                Ok(product) => valid.push(product),
                Err(field_errors) => errors.push(ItemError {
                    index,
                    id: None,
                    errors: field_errors,
                }),
            }
        }

        if !errors.is_empty() {
            return Err(rejected_create(errors, total));
        }

        let skus: Vec<(String, i64)> = valid.iter().map(|p| (p.sku.clone(), p.category)).collect();
        match self.repository.insert_products(valid).await {
            Ok(created) => {
                tracing::info!(count = created.len(), "Bulk created products");
                Ok(created)
            }
            // Lost a race with a concurrent writer after validation passed.
            Err(CatalogError::DuplicateSku(sku)) => {
                let errors = matching_items(&skus, |(s, _)| *s == sku, "sku", SKU_TAKEN);
                Err(rejected_create(errors, total))
            }
            Err(CatalogError::CategoryNotFound(category)) => {
                let errors = matching_items(
                    &skus,
                    |(_, c)| *c == category,
                    "category",
                    &category_missing(category),
                );
                Err(rejected_create(errors, total))
            }
            Err(e) => Err(e),
        }
    }

    /// Apply partial updates item by item. Items that succeed stay updated
    /// even when others fail; their ids are reported as `persisted`.
    pub async fn bulk_update(&self, items: Vec<Value>) -> CatalogResult<Vec<Product>> {
        let total = items.len();
        let mut known_categories = HashMap::new();
        let mut errors = Vec::new();
        let mut updated = Vec::with_capacity(total);

        for (index, item) in items.iter().enumerate() {
            let id = match payload::item_id(item) {
                Ok(id) => id,
                Err(field_errors) => {
                    errors.push(ItemError {
                        index,
                        id: None,
                        errors: field_errors,
                    });
                    continue;
                }
            };

            match self.update_one(id, item, &mut known_categories).await? {
                Ok(product) => updated.push(product),
                Err(field_errors) => errors.push(ItemError {
                    index,
                    id: Some(id),
                    errors: field_errors,
                }),
            }
        }

        if errors.is_empty() {
            tracing::info!(count = updated.len(), "Bulk updated products");
            return Ok(updated);
        }

        let persisted: Vec<i64> = updated.iter().map(|p| p.id).collect();
        tracing::warn!(
            failed = errors.len(),
            updated = persisted.len(),
            "Bulk update partially rejected"
        );
        Err(CatalogError::Rejected {
            message: format!(
                "{} of {} items failed; {} were updated",
                errors.len(),
                total,
                persisted.len()
            ),
            failure: BulkFailure {
                errors,
                persisted: Some(persisted),
            },
        })
    }

    /// Delete item by item, reporting unknown ids without stopping.
    pub async fn bulk_delete(&self, items: Vec<Value>) -> CatalogResult<Vec<i64>> {
        let total = items.len();
        let mut errors = Vec::new();
        let mut deleted = Vec::with_capacity(total);

        for (index, item) in items.iter().enumerate() {
            let id = match payload::item_id(item) {
                Ok(id) => id,
                Err(field_errors) => {
                    errors.push(ItemError {
                        index,
                        id: None,
                        errors: field_errors,
                    });
                    continue;
                }
            };

            if self.repository.delete_product(id).await? {
                deleted.push(id);
            } else {
                errors.push(ItemError {
                    index,
                    id: Some(id),
                    errors: field_error("id", product_missing(id)),
                });
            }
        }

        if errors.is_empty() {
            tracing::info!(count = deleted.len(), "Bulk deleted products");
            return Ok(deleted);
        }

        tracing::warn!(
            failed = errors.len(),
            deleted = deleted.len(),
            "Bulk delete partially rejected"
        );
        Err(CatalogError::Rejected {
            message: format!(
                "{} of {} items failed; {} were deleted",
                errors.len(),
                total,
                deleted.len()
            ),
            failure: BulkFailure {
                errors,
                persisted: Some(deleted),
            },
        })
    }

    async fn category_exists(
        &self,
        id: i64,
        known: &mut HashMap<i64, bool>,
    ) -> CatalogResult<bool> {
        if let Some(exists) = known.get(&id) {
            return Ok(*exists);
        }
        let exists = self.repository.get_category(id).await?.is_some();
        known.insert(id, exists);
        Ok(exists)
    }

    async fn check_new_product(
        &self,
        item: &Value,
        known_categories: &mut HashMap<i64, bool>,
        batch_skus: &mut HashSet<String>,
    ) -> ItemOutcome<NewProduct> {
        let fields = match payload::product_fields(item, Mode::Full) {
            Ok(fields) => fields,
            Err(errors) => return Ok(Err(errors)),
        };
        let mut errors = FieldErrors::new();

        if let Some(category) = fields.category {
            if !self.category_exists(category, known_categories).await? {
                errors.insert("category".to_string(), vec![category_missing(category)]);
            }
        }
        if let Some(sku) = &fields.sku {
            let taken = !batch_skus.insert(sku.clone())
                || self.repository.find_product_by_sku(sku).await?.is_some();
            if taken {
                errors.insert("sku".to_string(), vec![SKU_TAKEN.to_string()]);
            }
        }

        if !errors.is_empty() {
            return Ok(Err(errors));
        }
        fields
            .into_new_product()
            .map(Ok)
            .ok_or_else(|| CatalogError::Internal("decoded product is missing fields".to_string()))
    }

    async fn update_one(
        &self,
        id: i64,
        item: &Value,
        known_categories: &mut HashMap<i64, bool>,
    ) -> ItemOutcome<Product> {
        let Some(mut product) = self.repository.get_product(id).await? else {
            return Ok(Err(field_error("id", product_missing(id))));
        };
        let fields = match payload::product_fields(item, Mode::Partial) {
            Ok(fields) => fields,
            Err(errors) => return Ok(Err(errors)),
        };
        let mut errors = FieldErrors::new();

        if let Some(category) = fields.category {
            if !self.category_exists(category, known_categories).await? {
                errors.insert("category".to_string(), vec![category_missing(category)]);
            }
        }
        if let Some(sku) = fields.sku.as_deref().filter(|sku| *sku != product.sku) {
            if let Some(holder) = self.repository.find_product_by_sku(sku).await? {
                if holder.id != id {
                    errors.insert("sku".to_string(), vec![SKU_TAKEN.to_string()]);
                }
            }
        }
        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        product.apply(fields);
        match self.repository.update_product(product).await {
            Ok(updated) => Ok(Ok(updated)),
            Err(CatalogError::DuplicateSku(_)) => Ok(Err(field_error("sku", SKU_TAKEN))),
            Err(CatalogError::CategoryNotFound(category)) => {
                Ok(Err(field_error("category", category_missing(category))))
            }
            Err(CatalogError::ProductNotFound(_)) => Ok(Err(field_error("id", product_missing(id)))),
            Err(e) => Err(e),
        }
    }
}

fn rejected_create(errors: Vec<ItemError>, total: usize) -> CatalogError {
    tracing::warn!(failed = errors.len(), total, "Bulk create rejected");
    CatalogError::Rejected {
        message: format!(
            "{} of {} items failed validation; nothing was created",
            errors.len(),
            total
        ),
        failure: BulkFailure {
            errors,
            persisted: None,
        },
    }
}

/// Errors for every batch position whose (sku, category) satisfies `hit`.
fn matching_items(
    batch: &[(String, i64)],
    hit: impl Fn(&(String, i64)) -> bool,
    field: &str,
    message: &str,
) -> Vec<ItemError> {
    batch
        .iter()
        .enumerate()
        .filter(|(_, entry)| hit(entry))
        .map(|(index, _)| ItemError {
            index,
            id: None,
            errors: field_error(field, message),
        })
        .collect()
}

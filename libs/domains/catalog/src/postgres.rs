use async_trait::async_trait;
use database::BaseRepository;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, SqlErr, TransactionTrait,
};

use crate::{
    entity::{category, product},
    error::{CatalogError, CatalogResult},
    models::{Category, NewProduct, Product},
    query::{ProductCriteria, ProductOrdering, SortField},
    repository::{CatalogRepository, PageWindow},
};

/// PostgreSQL store. The schema enforces SKU uniqueness and the category
/// foreign key (with cascading deletes); violations come back as typed
/// [`CatalogError`]s.
pub struct PgCatalogRepository {
    categories: BaseRepository<category::Entity>,
    products: BaseRepository<product::Entity>,
}

impl PgCatalogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            categories: BaseRepository::new(db.clone()),
            products: BaseRepository::new(db),
        }
    }

    fn db(&self) -> &DatabaseConnection {
        self.products.db()
    }
}

fn db_error(err: DbErr) -> CatalogError {
    CatalogError::Database(err.to_string())
}

/// Map a failed write of `sku`/`category` onto the constraint it violated.
fn write_error(err: DbErr, sku: &str, category: i64) -> CatalogError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => CatalogError::DuplicateSku(sku.to_string()),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => CatalogError::CategoryNotFound(category),
        _ => db_error(err),
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn sort_column(field: SortField) -> product::Column {
    match field {
        SortField::Id => product::Column::Id,
        SortField::Name => product::Column::Name,
        SortField::Sku => product::Column::Sku,
        SortField::Price => product::Column::Price,
        SortField::Category => product::Column::CategoryId,
    }
}

fn filtered(criteria: &ProductCriteria) -> Select<product::Entity> {
    let mut query = product::Entity::find();

    if let Some(needle) = &criteria.sku_contains {
        let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
        query = query.filter(Expr::cust_with_values("LOWER(sku) LIKE $1", [pattern]));
    }
    if let Some(min) = criteria.min_price {
        query = query.filter(product::Column::Price.gte(min));
    }
    if let Some(max) = criteria.max_price {
        query = query.filter(product::Column::Price.lte(max));
    }

    query
}

fn ordered(mut query: Select<product::Entity>, ordering: &ProductOrdering) -> Select<product::Entity> {
    for term in ordering.terms() {
        let order = if term.descending {
            Order::Desc
        } else {
            Order::Asc
        };
        query = query.order_by(sort_column(term.field), order);
    }
    query.order_by_asc(product::Column::Id)
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn create_category(&self, name: &str) -> CatalogResult<Category> {
        let model = self
            .categories
            .insert(category::ActiveModel {
                name: sea_orm::ActiveValue::Set(name.to_string()),
                ..Default::default()
            })
            .await
            .map_err(db_error)?;

        tracing::info!(category_id = model.id, name, "Created category");
        Ok(model.into())
    }

    async fn get_or_create_category(&self, name: &str) -> CatalogResult<(Category, bool)> {
        let existing = category::Entity::find()
            .filter(category::Column::Name.eq(name))
            .order_by_asc(category::Column::Id)
            .one(self.db())
            .await
            .map_err(db_error)?;

        match existing {
            Some(model) => Ok((model.into(), false)),
            None => Ok((self.create_category(name).await?, true)),
        }
    }

    async fn get_category(&self, id: i64) -> CatalogResult<Option<Category>> {
        let model = self.categories.find_by_id(id).await.map_err(db_error)?;
        Ok(model.map(Into::into))
    }

    async fn delete_category(&self, id: i64) -> CatalogResult<bool> {
        let rows_affected = self.categories.delete_by_id(id).await.map_err(db_error)?;

        if rows_affected > 0 {
            tracing::info!(category_id = id, "Deleted category");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn insert_product(&self, input: NewProduct) -> CatalogResult<Product> {
        let (sku, category) = (input.sku.clone(), input.category);
        let active_model: product::ActiveModel = input.into();

        let model = self
            .products
            .insert(active_model)
            .await
            .map_err(|e| write_error(e, &sku, category))?;

        tracing::info!(product_id = model.id, sku = %model.sku, "Created product");
        Ok(model.into())
    }

    async fn insert_products(&self, inputs: Vec<NewProduct>) -> CatalogResult<Vec<Product>> {
        let txn = self.db().begin().await.map_err(db_error)?;

        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let (sku, category) = (input.sku.clone(), input.category);
            let active_model: product::ActiveModel = input.into();
            // Dropping `txn` on the error path rolls the batch back.
            let model = active_model
                .insert(&txn)
                .await
                .map_err(|e| write_error(e, &sku, category))?;
            created.push(Product::from(model));
        }

        txn.commit().await.map_err(db_error)?;

        tracing::info!(count = created.len(), "Created products");
        Ok(created)
    }

    async fn get_product(&self, id: i64) -> CatalogResult<Option<Product>> {
        let model = self.products.find_by_id(id).await.map_err(db_error)?;
        Ok(model.map(Into::into))
    }

    async fn find_product_by_sku(&self, sku: &str) -> CatalogResult<Option<Product>> {
        let model = product::Entity::find()
            .filter(product::Column::Sku.eq(sku))
            .one(self.db())
            .await
            .map_err(db_error)?;

        Ok(model.map(Into::into))
    }

    async fn filter_products(
        &self,
        criteria: &ProductCriteria,
        ordering: &ProductOrdering,
        window: PageWindow,
    ) -> CatalogResult<Vec<Product>> {
        let models = ordered(filtered(criteria), ordering)
            .offset(window.offset)
            .limit(window.limit)
            .all(self.db())
            .await
            .map_err(db_error)?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn count_products(&self, criteria: &ProductCriteria) -> CatalogResult<u64> {
        filtered(criteria).count(self.db()).await.map_err(db_error)
    }

    async fn update_product(&self, input: Product) -> CatalogResult<Product> {
        let (id, sku, category) = (input.id, input.sku.clone(), input.category);
        let active_model: product::ActiveModel = input.into();

        let model = self
            .products
            .update(active_model)
            .await
            .map_err(|e| match e {
                DbErr::RecordNotUpdated => CatalogError::ProductNotFound(id),
                other => write_error(other, &sku, category),
            })?;

        tracing::info!(product_id = id, "Updated product");
        Ok(model.into())
    }

    async fn delete_product(&self, id: i64) -> CatalogResult<bool> {
        let rows_affected = self.products.delete_by_id(id).await.map_err(db_error)?;

        if rows_affected > 0 {
            tracing::info!(product_id = id, "Deleted product");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

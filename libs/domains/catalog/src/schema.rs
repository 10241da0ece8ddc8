//! Table bootstrap for the PostgreSQL store.

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

use crate::entity::{category, product};

/// Create `categories`, `products` and the category index if missing.
///
/// Safe to run on every start.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut categories = schema.create_table_from_entity(category::Entity);
    categories.if_not_exists();
    db.execute_raw(backend.build(&categories)).await?;

    let mut products = schema.create_table_from_entity(product::Entity);
    products.if_not_exists();
    db.execute_raw(backend.build(&products)).await?;

    let index = Index::create()
        .if_not_exists()
        .name("idx_products_category_id")
        .table(product::Entity)
        .col(product::Column::CategoryId)
        .to_owned();
    db.execute_raw(backend.build(&index)).await?;

    tracing::info!("Catalog schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[test]
    fn test_products_table_definition() {
        let backend = DatabaseBackend::Postgres;
        let mut stmt = Schema::new(backend).create_table_from_entity(product::Entity);
        stmt.if_not_exists();
        let sql = backend.build(&stmt).to_string();

        assert!(sql.starts_with(r#"CREATE TABLE IF NOT EXISTS "products""#), "{}", sql);
        assert!(sql.contains("UNIQUE"), "{}", sql);
        assert!(sql.contains("decimal(10, 2)"), "{}", sql);
        assert!(sql.contains(r#"REFERENCES "categories" ("id")"#), "{}", sql);
        assert!(sql.contains("ON DELETE CASCADE"), "{}", sql);
    }

    #[tokio::test]
    async fn test_ensure_schema_runs_three_statements() {
        let done = || MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([done(), done(), done()])
            .into_connection();

        ensure_schema(&db).await.unwrap();

        assert_eq!(db.into_transaction_log().len(), 3);
    }
}

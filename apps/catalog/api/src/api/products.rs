use axum::Router;
use domain_catalog::{InMemoryCatalogRepository, PgCatalogRepository, ProductService, handlers};

pub fn router(state: &crate::state::AppState) -> Router {
    let pagination = state.config.pagination.clone();

    match &state.db {
        Some(db) => {
            let repository = PgCatalogRepository::new(db.clone());
            handlers::router(ProductService::with_pagination(repository, pagination))
        }
        None => {
            let repository = InMemoryCatalogRepository::new();
            handlers::router(ProductService::with_pagination(repository, pagination))
        }
    }
}

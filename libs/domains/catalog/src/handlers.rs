use axum::{
    Json, Router,
    extract::{OriginalUri, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use axum_helpers::IdPath;
use serde_json::Value;
use std::sync::Arc;

use crate::error::CatalogResult;
use crate::models::Product;
use crate::pagination::{Page, PageLinks};
use crate::payload;
use crate::repository::CatalogRepository;
use crate::service::ProductService;

type SharedService<R> = State<Arc<ProductService<R>>>;

/// Create the product router with all HTTP endpoints
pub fn router<R: CatalogRepository + 'static>(service: ProductService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/products/", get(list_products))
        .route("/products/bulk-create/", post(bulk_create))
        .route("/products/bulk-update/", put(bulk_update))
        .route("/products/bulk-delete/", delete(bulk_delete))
        .route("/products/{id}/", get(get_product))
        .with_state(shared_service)
}

/// List products with filters, ordering and page links
///
/// Links are built from the original URI so they keep any prefix the router
/// is nested under.
async fn list_products<R: CatalogRepository + 'static>(
    State(service): SharedService<R>,
    OriginalUri(uri): OriginalUri,
) -> CatalogResult<Json<Page<Product>>> {
    let links = PageLinks::from_uri(&uri)?;
    let query = service.parse_query(links.pairs())?;
    let page = service.list_products(&query, &links).await?;
    Ok(Json(page))
}

async fn get_product<R: CatalogRepository + 'static>(
    State(service): SharedService<R>,
    IdPath(id): IdPath,
) -> CatalogResult<Json<Product>> {
    let product = service.get_product(id).await?;
    Ok(Json(product))
}

/// Create every product in the body, or none of them
async fn bulk_create<R: CatalogRepository + 'static>(
    State(service): SharedService<R>,
    body: Result<Json<Value>, JsonRejection>,
) -> CatalogResult<impl IntoResponse> {
    let Json(body) = body?;
    let created = service.bulk_create(payload::expect_list(body)?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn bulk_update<R: CatalogRepository + 'static>(
    State(service): SharedService<R>,
    body: Result<Json<Value>, JsonRejection>,
) -> CatalogResult<Json<Vec<Product>>> {
    let Json(body) = body?;
    let updated = service.bulk_update(payload::expect_list(body)?).await?;
    Ok(Json(updated))
}

async fn bulk_delete<R: CatalogRepository + 'static>(
    State(service): SharedService<R>,
    body: Result<Json<Value>, JsonRejection>,
) -> CatalogResult<StatusCode> {
    let Json(body) = body?;
    service.bulk_delete(payload::expect_list(body)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Catalog Domain
//!
//! Products and the categories they belong to, served over a paginated,
//! filterable list endpoint plus bulk create, update and delete.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, JSON bodies, query strings
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Bulk semantics, category and SKU checks, pagination
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + in-memory and PostgreSQL stores)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Records, field validation, typed list queries
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_catalog::{handlers, repository::InMemoryCatalogRepository, service::ProductService};
//!
//! let service = ProductService::new(InMemoryCatalogRepository::new());
//! let router = handlers::router(service);
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod payload;
pub mod postgres;
pub mod query;
pub mod repository;
pub mod schema;
pub mod seed;
pub mod service;

pub use error::{BulkFailure, CatalogError, CatalogResult, FieldErrors, ItemError};
pub use models::{Category, NewProduct, Product, ProductFields};
pub use pagination::{Page, PageLinks, PaginationConfig};
pub use postgres::PgCatalogRepository;
pub use query::{PageRequest, ProductCriteria, ProductOrdering, ProductQuery, SortField};
pub use repository::{CatalogRepository, InMemoryCatalogRepository, PageWindow};
pub use schema::ensure_schema;
pub use seed::{SeedReport, populate_products};
pub use service::ProductService;

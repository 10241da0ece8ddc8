use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name to the messages raised for it
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub(crate) const SKU_TAKEN: &str = "product with this sku already exists.";

pub(crate) fn field_error(field: &str, message: impl Into<String>) -> FieldErrors {
    BTreeMap::from([(field.to_string(), vec![message.into()])])
}

pub(crate) fn category_missing(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

pub(crate) fn product_missing(id: i64) -> String {
    format!("Product with id {} does not exist.", id)
}

/// Errors for one item of a bulk request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemError {
    /// Position of the item in the request array
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub errors: FieldErrors,
}

/// Aggregated outcome of a rejected bulk request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkFailure {
    pub errors: Vec<ItemError>,
    /// Ids that were written before the request was rejected. `None` for
    /// all-or-nothing operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<Vec<i64>>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    #[error("Product with sku '{0}' already exists")]
    DuplicateSku(String),

    #[error("Invalid query parameter '{param}': {message}")]
    InvalidQuery { param: String, message: String },

    #[error("Invalid page.")]
    InvalidPage,

    /// Bulk body that is not a JSON array; carries the received type name
    #[error("Expected a list of items but got type \"{0}\"")]
    NotAList(&'static str),

    #[error("{message}")]
    Rejected {
        message: String,
        failure: BulkFailure,
    },

    #[error(transparent)]
    Body(#[from] JsonRejection),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

fn invalid(message: impl Into<String>, details: serde_json::Value) -> AppError {
    AppError::InvalidInput {
        message: message.into(),
        details,
    }
}

/// Convert CatalogError to AppError for standardized error responses
impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ProductNotFound(id) => {
                AppError::NotFound(format!("Product {} not found", id))
            }
            CatalogError::CategoryNotFound(id) => invalid(
                "Request validation failed",
                json!({ "category": [category_missing(id)] }),
            ),
            CatalogError::DuplicateSku(_) => {
                invalid("Request validation failed", json!({ "sku": [SKU_TAKEN] }))
            }
            CatalogError::InvalidQuery { param, message } => invalid(
                format!("Invalid query parameter '{}'", param),
                json!({ param: [message] }),
            ),
            CatalogError::InvalidPage => AppError::NotFound("Invalid page.".to_string()),
            CatalogError::NotAList(type_name) => invalid(
                "Request validation failed",
                json!({
                    "non_field_errors": [
                        format!("Expected a list of items but got type \"{}\".", type_name)
                    ]
                }),
            ),
            CatalogError::Rejected { message, failure } => match serde_json::to_value(&failure) {
                Ok(details) => invalid(message, details),
                Err(e) => AppError::SerdeJson(e),
            },
            CatalogError::Body(rejection) => AppError::JsonExtractorRejection(rejection),
            CatalogError::Database(msg) => AppError::Database(msg),
            CatalogError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

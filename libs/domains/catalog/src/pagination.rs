//! Page-number pagination for the product list.

use axum::http::Uri;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use serde::Serialize;

use crate::error::{CatalogError, CatalogResult};
use crate::query::{PAGE_PARAM, PageRequest};
use crate::repository::PageWindow;

/// Page size policy, passed to the service at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    pub page_size: u64,
    /// Query parameter clients use to override `page_size`
    pub page_size_query_param: String,
    /// Larger requested sizes are clamped to this
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            page_size_query_param: "page_size".to_string(),
            max_page_size: 100,
        }
    }
}

/// Environment variables:
/// - `PAGE_SIZE` (default: 10)
/// - `MAX_PAGE_SIZE` (default: 100)
/// - `PAGE_SIZE_QUERY_PARAM` (default: page_size)
impl FromEnv for PaginationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let page_size: u64 = env_parse("PAGE_SIZE", "10")?;
        let max_page_size: u64 = env_parse("MAX_PAGE_SIZE", "100")?;

        if page_size == 0 || page_size > max_page_size {
            return Err(ConfigError::ParseError {
                key: "PAGE_SIZE".to_string(),
                details: format!("must be between 1 and MAX_PAGE_SIZE ({})", max_page_size),
            });
        }

        Ok(Self {
            page_size,
            page_size_query_param: env_or_default("PAGE_SIZE_QUERY_PARAM", "page_size"),
            max_page_size,
        })
    }
}

/// List response envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// A resolved page number within a result set of known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePosition {
    pub number: u64,
    pub num_pages: u64,
    pub page_size: u64,
}

impl PagePosition {
    /// An empty result set still has one (empty) page.
    pub fn resolve(request: PageRequest, count: u64, page_size: u64) -> CatalogResult<Self> {
        let num_pages = count.div_ceil(page_size).max(1);
        let number = match request {
            PageRequest::Last => num_pages,
            PageRequest::Number(n) if (1..=num_pages).contains(&n) => n,
            PageRequest::Number(_) => return Err(CatalogError::InvalidPage),
        };

        Ok(Self {
            number,
            num_pages,
            page_size,
        })
    }

    pub fn window(&self) -> PageWindow {
        PageWindow {
            offset: (self.number - 1) * self.page_size,
            limit: self.page_size,
        }
    }

    pub fn next(&self) -> Option<u64> {
        (self.number < self.num_pages).then_some(self.number + 1)
    }

    pub fn previous(&self) -> Option<u64> {
        (self.number > 1).then_some(self.number - 1)
    }
}

/// The request path and query, for building `next`/`previous` links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLinks {
    path: String,
    pairs: Vec<(String, String)>,
}

impl PageLinks {
    pub fn new(path: impl Into<String>, pairs: Vec<(String, String)>) -> Self {
        Self {
            path: path.into(),
            pairs,
        }
    }

    pub fn from_uri(uri: &Uri) -> CatalogResult<Self> {
        let pairs = match uri.query() {
            Some(query) => serde_urlencoded::from_str(query).map_err(|e| {
                CatalogError::InvalidQuery {
                    param: "query".to_string(),
                    message: e.to_string(),
                }
            })?,
            None => Vec::new(),
        };

        Ok(Self::new(uri.path(), pairs))
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Link to `page`, with parameters sorted by key. Page 1 carries no
    /// `page` parameter at all.
    pub fn page_url(&self, page: u64) -> String {
        let mut pairs: Vec<(&str, String)> = self
            .pairs
            .iter()
            .filter(|(key, _)| key != PAGE_PARAM)
            .map(|(key, value)| (key.as_str(), value.clone()))
            .collect();
        if page > 1 {
            pairs.push((PAGE_PARAM, page.to_string()));
        }
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        match serde_urlencoded::to_string(&pairs) {
            Ok(query) if !query.is_empty() => format!("{}?{}", self.path, query),
            _ => self.path.clone(),
        }
    }

    pub fn page<T>(&self, position: PagePosition, count: u64, results: Vec<T>) -> Page<T> {
        Page {
            count,
            next: position.next().map(|n| self.page_url(n)),
            previous: position.previous().map(|n| self.page_url(n)),
            results,
        }
    }
}

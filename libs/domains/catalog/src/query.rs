//! Typed list query: filters, ordering and the requested page.
//!
//! The raw query string is parsed once per request into a [`ProductQuery`];
//! both stores evaluate the same [`ProductCriteria`] and [`ProductOrdering`].

use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;
use strum::{Display, EnumString};

use crate::error::{CatalogError, CatalogResult};
use crate::models::Product;
use crate::pagination::PaginationConfig;
use crate::payload::parse_decimal;

pub const PAGE_PARAM: &str = "page";

/// Conjunctive product filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCriteria {
    /// Case-insensitive substring of the SKU
    pub sku_contains: Option<String>,
    /// Inclusive lower bound
    pub min_price: Option<Decimal>,
    /// Inclusive upper bound
    pub max_price: Option<Decimal>,
}

impl ProductCriteria {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(needle) = &self.sku_contains {
            if !product.sku.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SortField {
    Id,
    Name,
    Sku,
    Price,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: SortField,
    pub descending: bool,
}

impl OrderTerm {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// Ordering terms applied left to right; ascending `id` always breaks ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductOrdering(Vec<OrderTerm>);

impl Default for ProductOrdering {
    fn default() -> Self {
        Self(vec![OrderTerm::asc(SortField::Sku)])
    }
}

impl ProductOrdering {
    pub fn new(terms: Vec<OrderTerm>) -> Self {
        if terms.is_empty() {
            Self::default()
        } else {
            Self(terms)
        }
    }

    pub fn terms(&self) -> &[OrderTerm] {
        &self.0
    }

    /// Parse `ordering=price,-name`.
    pub fn parse(raw: &str) -> CatalogResult<Self> {
        let terms = raw
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| {
                let (name, descending) = match term.strip_prefix('-') {
                    Some(name) => (name, true),
                    None => (term, false),
                };
                SortField::from_str(name)
                    .map(|field| OrderTerm { field, descending })
                    .map_err(|_| CatalogError::InvalidQuery {
                        param: "ordering".to_string(),
                        message: format!("Invalid ordering field \"{}\".", term),
                    })
            })
            .collect::<CatalogResult<Vec<_>>>()?;

        Ok(Self::new(terms))
    }

    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        for term in &self.0 {
            let ordering = match term.field {
                SortField::Id => a.id.cmp(&b.id),
                SortField::Name => a.name.cmp(&b.name),
                SortField::Sku => a.sku.cmp(&b.sku),
                SortField::Price => a.price.cmp(&b.price),
                SortField::Category => a.category.cmp(&b.category),
            };
            let ordering = if term.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.id.cmp(&b.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(u64),
    Last,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl FromStr for PageRequest {
    type Err = CatalogError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == "last" {
            return Ok(Self::Last);
        }
        match raw.parse::<u64>() {
            Ok(number) if number >= 1 => Ok(Self::Number(number)),
            _ => Err(CatalogError::InvalidPage),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub criteria: ProductCriteria,
    pub ordering: ProductOrdering,
    pub page: PageRequest,
    pub page_size: u64,
}

impl ProductQuery {
    /// Build the query from decoded query-string pairs.
    ///
    /// A repeated key keeps its last value. Empty values count as absent, and
    /// so do blank ones except for `sku`, which matches whitespace literally.
    /// A page size that is not a positive integer falls back to the default.
    pub fn from_pairs(pairs: &[(String, String)], config: &PaginationConfig) -> CatalogResult<Self> {
        let mut params: HashMap<&str, &str> = pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        params.retain(|_, value| !value.is_empty());

        let criteria = ProductCriteria {
            sku_contains: params.get("sku").map(|sku| sku.to_string()),
            min_price: price_bound(&params, "min_price")?,
            max_price: price_bound(&params, "max_price")?,
        };

        let ordering = match trimmed(&params, "ordering") {
            Some(raw) => ProductOrdering::parse(raw)?,
            None => ProductOrdering::default(),
        };

        let page_size = trimmed(&params, &config.page_size_query_param)
            .and_then(|raw| requested_page_size(raw, config.max_page_size))
            .unwrap_or(config.page_size);

        let page = match trimmed(&params, PAGE_PARAM) {
            Some(raw) => raw.parse()?,
            None => PageRequest::default(),
        };

        Ok(Self {
            criteria,
            ordering,
            page,
            page_size,
        })
    }
}

fn trimmed<'a>(params: &HashMap<&str, &'a str>, param: &str) -> Option<&'a str> {
    params
        .get(param)
        .map(|raw| raw.trim())
        .filter(|raw| !raw.is_empty())
}

/// Clamp a client page size to `max`; digits too long for `u64` are still
/// just a large size.
fn requested_page_size(raw: &str, max: u64) -> Option<u64> {
    match raw.parse::<u64>() {
        Ok(0) => None,
        Ok(size) => Some(size.min(max)),
        Err(_) if raw.bytes().all(|b| b.is_ascii_digit()) => Some(max),
        Err(_) => None,
    }
}

fn price_bound(params: &HashMap<&str, &str>, param: &str) -> CatalogResult<Option<Decimal>> {
    trimmed(params, param)
        .map(|raw| {
            parse_decimal(raw).ok_or_else(|| CatalogError::InvalidQuery {
                param: param.to_string(),
                message: "A valid number is required.".to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn parse(raw: &[(&str, &str)]) -> CatalogResult<ProductQuery> {
        ProductQuery::from_pairs(&pairs(raw), &PaginationConfig::default())
    }

    fn product(id: i64, sku: &str, price: &str) -> Product {
        Product {
            id,
            name: format!("Product {}", id),
            sku: sku.to_string(),
            price: Decimal::from_str(price).unwrap(),
            category: 1,
        }
    }

    #[test]
    fn test_defaults() {
        let query = parse(&[]).unwrap();

        assert_eq!(query.criteria, ProductCriteria::default());
        assert_eq!(query.ordering, ProductOrdering::default());
        assert_eq!(query.page, PageRequest::Number(1));
        assert_eq!(query.page_size, 10);
    }

    #[test]
    fn test_filters_and_last_value_wins() {
        let query = parse(&[
            ("sku", "old"),
            ("sku", "sku00"),
            ("min_price", "10"),
            ("max_price", ""),
        ])
        .unwrap();

        assert_eq!(query.criteria.sku_contains.as_deref(), Some("sku00"));
        assert_eq!(query.criteria.min_price, Some(Decimal::from(10)));
        assert_eq!(query.criteria.max_price, None);
    }

    #[test]
    fn test_malformed_price_bound() {
        let err = parse(&[("max_price", "cheap")]).unwrap_err();
        assert!(
            matches!(err, CatalogError::InvalidQuery { ref param, .. } if param == "max_price")
        );
    }

    #[test]
    fn test_ordering_terms() {
        let query = parse(&[("ordering", "-price, name")]).unwrap();
        assert_eq!(
            query.ordering.terms(),
            &[OrderTerm::desc(SortField::Price), OrderTerm::asc(SortField::Name)]
        );
    }

    #[test]
    fn test_unknown_ordering_field() {
        let err = parse(&[("ordering", "weight")]).unwrap_err();
        assert!(
            matches!(err, CatalogError::InvalidQuery { ref param, .. } if param == "ordering")
        );
    }

    #[test]
    fn test_page_size_is_clamped() {
        let query = parse(&[("page_size", "500")]).unwrap();
        assert_eq!(query.page_size, 100);
    }

    #[test]
    fn test_page_size_beyond_u64_is_clamped() {
        let query = parse(&[("page_size", "100000000000000000000")]).unwrap();
        assert_eq!(query.page_size, 100);
    }

    #[test]
    fn test_unusable_page_size_falls_back_to_default() {
        for raw in ["0", "ten", "-5", "2.5", "  "] {
            let query = parse(&[("page_size", raw)]).unwrap();
            assert_eq!(query.page_size, 10, "{:?}", raw);
        }
    }

    #[test]
    fn test_blank_sku_is_kept_as_needle() {
        let query = parse(&[("sku", " "), ("min_price", " "), ("ordering", " ")]).unwrap();

        assert_eq!(query.criteria.sku_contains.as_deref(), Some(" "));
        assert_eq!(query.criteria.min_price, None);
        assert_eq!(query.ordering, ProductOrdering::default());
    }

    #[test]
    fn test_custom_page_size_param() {
        let config = PaginationConfig {
            page_size_query_param: "limit".to_string(),
            ..PaginationConfig::default()
        };
        let query = ProductQuery::from_pairs(&pairs(&[("limit", "3"), ("page_size", "x")]), &config)
            .unwrap();
        assert_eq!(query.page_size, 3);
    }

    #[test]
    fn test_page_values() {
        assert_eq!(parse(&[("page", "last")]).unwrap().page, PageRequest::Last);
        assert_eq!(parse(&[("page", "3")]).unwrap().page, PageRequest::Number(3));
        assert!(matches!(parse(&[("page", "0")]), Err(CatalogError::InvalidPage)));
        assert!(matches!(parse(&[("page", "two")]), Err(CatalogError::InvalidPage)));
    }

    #[test]
    fn test_criteria_matches_case_insensitively_and_inclusively() {
        let criteria = ProductCriteria {
            sku_contains: Some("sku00".to_string()),
            min_price: Some(Decimal::from_str("10.99").unwrap()),
            max_price: Some(Decimal::from_str("15.49").unwrap()),
        };

        assert!(criteria.matches(&product(1, "SKU001", "10.99")));
        assert!(criteria.matches(&product(3, "SKU003", "15.49")));
        assert!(!criteria.matches(&product(2, "SKU002", "19.99")));
        assert!(!criteria.matches(&product(4, "ABC", "12.00")));
    }

    #[test]
    fn test_compare_breaks_ties_by_id() {
        let ordering = ProductOrdering::parse("-price").unwrap();
        let mut products = vec![
            product(3, "C", "5.00"),
            product(1, "A", "5.00"),
            product(2, "B", "9.00"),
        ];

        products.sort_by(|a, b| ordering.compare(a, b));

        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}

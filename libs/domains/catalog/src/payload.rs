//! Decoding of untyped JSON request items into [`ProductFields`].
//!
//! Each field is decoded independently so one bad field does not hide the
//! errors of another. Messages follow Django REST framework wording, which is
//! what existing clients of this API match on.

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use validator::Validate;

use crate::error::{CatalogError, CatalogResult, FieldErrors, field_error};
use crate::models::ProductFields;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_A_NUMBER: &str = "A valid number is required.";
const NOT_AN_INTEGER: &str = "A valid integer is required.";

/// Whether absent fields are errors (create) or left untouched (update)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Full,
    Partial,
}

/// Python-style type name used in client-facing messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// The body of every bulk endpoint must be a JSON array.
pub fn expect_list(body: Value) -> CatalogResult<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        other => Err(CatalogError::NotAList(type_name(&other))),
    }
}

fn expect_object(item: &Value) -> Result<&Map<String, Value>, FieldErrors> {
    item.as_object().ok_or_else(|| {
        field_error(
            "non_field_errors",
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                type_name(item)
            ),
        )
    })
}

/// Decode the writable product fields of one item.
pub fn product_fields(item: &Value, mode: Mode) -> Result<ProductFields, FieldErrors> {
    let object = expect_object(item)?;
    let mut errors = FieldErrors::new();

    let fields = ProductFields {
        name: decode(object, "name", mode, text, &mut errors),
        sku: decode(object, "sku", mode, text, &mut errors),
        price: decode(object, "price", mode, decimal, &mut errors),
        category: decode(object, "category", mode, primary_key, &mut errors),
    };

    if let Err(validation) = fields.validate() {
        for (field, messages) in axum_helpers::errors::field_messages(&validation) {
            errors.entry(field).or_default().extend(messages);
        }
    }

    if errors.is_empty() {
        Ok(fields)
    } else {
        Err(errors)
    }
}

/// Read the `id` of an update or delete item.
pub fn item_id(item: &Value) -> Result<i64, FieldErrors> {
    let object = expect_object(item)?;
    let mut errors = FieldErrors::new();

    match decode(object, "id", Mode::Full, integer, &mut errors) {
        Some(id) => Ok(id),
        None => Err(errors),
    }
}

fn decode<T>(
    object: &Map<String, Value>,
    field: &str,
    mode: Mode,
    convert: fn(&Value) -> Result<T, String>,
    errors: &mut FieldErrors,
) -> Option<T> {
    let message = match object.get(field) {
        None if mode == Mode::Partial => return None,
        None => REQUIRED.to_string(),
        Some(Value::Null) => NOT_NULL.to_string(),
        Some(value) => match convert(value) {
            Ok(converted) => return Some(converted),
            Err(message) => message,
        },
    };

    errors.entry(field.to_string()).or_default().push(message);
    None
}

fn text(value: &Value) -> Result<String, String> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(NOT_A_STRING.to_string()),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NOT_BLANK.to_string());
    }
    Ok(trimmed.to_string())
}

fn decimal(value: &Value) -> Result<Decimal, String> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(NOT_A_NUMBER.to_string()),
    };

    parse_decimal(&raw).ok_or_else(|| NOT_A_NUMBER.to_string())
}

/// Plain or scientific notation; `None` when neither parses.
pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn integer(value: &Value) -> Result<i64, String> {
    match value {
        Value::Bool(_) => Err(NOT_AN_INTEGER.to_string()),
        _ => integral(value).ok_or_else(|| NOT_AN_INTEGER.to_string()),
    }
}

fn primary_key(value: &Value) -> Result<i64, String> {
    let incorrect = || {
        format!(
            "Incorrect type. Expected pk value, received {}.",
            type_name(value)
        )
    };

    match value {
        Value::Bool(_) => Err(incorrect()),
        _ => integral(value).ok_or_else(incorrect),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors_for(item: Value, mode: Mode) -> FieldErrors {
        product_fields(&item, mode).unwrap_err()
    }

    #[test]
    fn test_full_item_decodes() {
        let fields = product_fields(
            &json!({"name": " Product A ", "sku": "SKU001", "price": "10.99", "category": 1}),
            Mode::Full,
        )
        .unwrap();

        assert_eq!(fields.name.as_deref(), Some("Product A"));
        assert_eq!(fields.price, Some(Decimal::from_str("10.99").unwrap()));
        assert_eq!(fields.category, Some(1));
    }

    #[test]
    fn test_numbers_are_accepted_for_text_and_price() {
        let fields = product_fields(
            &json!({"name": 42, "sku": "SKU042", "price": 19.5, "category": "3"}),
            Mode::Full,
        )
        .unwrap();

        assert_eq!(fields.name.as_deref(), Some("42"));
        assert_eq!(fields.price, Some(Decimal::from_str("19.5").unwrap()));
        assert_eq!(fields.category, Some(3));
    }

    #[test]
    fn test_missing_fields_are_required_in_full_mode() {
        let errors = errors_for(json!({"name": "A"}), Mode::Full);

        assert_eq!(errors["sku"], vec![REQUIRED.to_string()]);
        assert_eq!(errors["price"], vec![REQUIRED.to_string()]);
        assert_eq!(errors["category"], vec![REQUIRED.to_string()]);
        assert!(!errors.contains_key("name"));
    }

    #[test]
    fn test_partial_mode_skips_absent_fields() {
        let fields = product_fields(&json!({"id": 4, "name": "Renamed"}), Mode::Partial).unwrap();

        assert_eq!(fields.name.as_deref(), Some("Renamed"));
        assert_eq!(fields.sku, None);
        assert_eq!(fields.price, None);
    }

    #[test]
    fn test_null_blank_and_wrong_types() {
        let errors = errors_for(
            json!({"name": null, "sku": "   ", "price": "abc", "category": true}),
            Mode::Full,
        );

        assert_eq!(errors["name"], vec![NOT_NULL.to_string()]);
        assert_eq!(errors["sku"], vec![NOT_BLANK.to_string()]);
        assert_eq!(errors["price"], vec![NOT_A_NUMBER.to_string()]);
        assert_eq!(
            errors["category"],
            vec!["Incorrect type. Expected pk value, received bool.".to_string()]
        );
    }

    #[test]
    fn test_validator_rules_are_merged() {
        let errors = errors_for(
            json!({"name": "n".repeat(101), "sku": "S", "price": "1.234", "category": 1}),
            Mode::Full,
        );

        assert_eq!(
            errors["name"],
            vec!["Ensure this field has no more than 100 characters.".to_string()]
        );
        assert_eq!(
            errors["price"],
            vec!["Ensure that there are no more than 2 decimal places.".to_string()]
        );
    }

    #[test]
    fn test_non_object_item() {
        let errors = errors_for(json!([1, 2]), Mode::Full);
        assert_eq!(
            errors["non_field_errors"],
            vec!["Invalid data. Expected a dictionary, but got list.".to_string()]
        );
    }

    #[test]
    fn test_item_id() {
        assert_eq!(item_id(&json!({"id": 7})).unwrap(), 7);
        assert_eq!(item_id(&json!({"id": "8"})).unwrap(), 8);
        assert_eq!(
            item_id(&json!({"name": "x"})).unwrap_err()["id"],
            vec![REQUIRED.to_string()]
        );
        assert_eq!(
            item_id(&json!({"id": "seven"})).unwrap_err()["id"],
            vec![NOT_AN_INTEGER.to_string()]
        );
    }

    #[test]
    fn test_expect_list() {
        assert_eq!(expect_list(json!([{"id": 1}])).unwrap().len(), 1);
        assert!(matches!(
            expect_list(json!({"id": 1})),
            Err(CatalogError::NotAList("dict"))
        ));
    }

    #[test]
    fn test_parse_decimal_scientific() {
        assert_eq!(parse_decimal("1e2"), Some(Decimal::from(100)));
        assert_eq!(parse_decimal("ten"), None);
    }
}

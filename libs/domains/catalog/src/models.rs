use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

pub const PRICE_MAX_DIGITS: u32 = 10;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Product as stored and as rendered on read paths.
///
/// ```json
/// {"id": 1, "name": "Product A", "sku": "SKU001", "price": "10.99", "category": 1}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub sku: String,
    #[serde(serialize_with = "serialize_price")]
    pub price: Decimal,
    /// Id of the owning category
    pub category: i64,
}

impl Product {
    /// Replace the fields present in `fields`, keeping the rest.
    pub fn apply(&mut self, fields: ProductFields) {
        if let Some(name) = fields.name {
            self.name = name;
        }
        if let Some(sku) = fields.sku {
            self.sku = sku;
        }
        if let Some(price) = fields.price {
            self.price = normalize_price(price);
        }
        if let Some(category) = fields.category {
            self.category = category;
        }
    }
}

/// A product that has passed validation but has no id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub category: i64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, sku: impl Into<String>, price: Decimal, category: i64) -> Self {
        Self {
            name: name.into(),
            sku: sku.into(),
            price: normalize_price(price),
            category,
        }
    }
}

/// Writable product fields decoded from a request item.
///
/// Absent fields are `None`. Type and presence checks happen while decoding
/// (see [`crate::payload`]); the length and precision rules below run on
/// whatever was decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct ProductFields {
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub name: Option<String>,

    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub sku: Option<String>,

    #[validate(custom(function = "validate_price"))]
    pub price: Option<Decimal>,

    pub category: Option<i64>,
}

impl ProductFields {
    /// Every field must be present; `None` otherwise.
    pub fn into_new_product(self) -> Option<NewProduct> {
        Some(NewProduct::new(
            self.name?,
            self.sku?,
            self.price?,
            self.category?,
        ))
    }
}

fn price_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Digit limits for NUMERIC(10, 2), counted on the value as written, so
/// `10.990` has three decimal places.
fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    let scale = price.scale();
    let digits = price.mantissa().unsigned_abs().to_string().len() as u32;

    let (total_digits, whole_digits) = if digits > scale {
        (digits, digits - scale)
    } else {
        (scale, 0)
    };

    if total_digits > PRICE_MAX_DIGITS {
        return Err(price_error(
            "max_digits",
            "Ensure that there are no more than 10 digits in total.",
        ));
    }
    if scale > PRICE_DECIMAL_PLACES {
        return Err(price_error(
            "max_decimal_places",
            "Ensure that there are no more than 2 decimal places.",
        ));
    }
    if whole_digits > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES {
        return Err(price_error(
            "max_whole_digits",
            "Ensure that there are no more than 8 digits before the decimal point.",
        ));
    }
    Ok(())
}

/// Stored prices always carry exactly two decimal places.
pub fn normalize_price(mut price: Decimal) -> Decimal {
    price.rescale(PRICE_DECIMAL_PLACES);
    price
}

fn serialize_price<S: Serializer>(price: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{:.2}", price))
}

//! Validation of products and deals handed to the tools as JSON strings.

use dealscope_core::{CanonicalProduct, Deal, DEFAULT_CURRENCY, UNKNOWN_PRODUCT_NAME};
use serde_json::{Map, Value};

use crate::DealError;

/// Parses the products array produced by `fetch_page`.
///
/// The payload must be a JSON array of objects. Each object is coerced
/// leniently: absent fields take defaults, prices may be numbers or numeric
/// strings, and anything else becomes `None`. `category` fills in items that
/// carry none.
///
/// # Errors
///
/// Returns [`DealError::InvalidProducts`] if the payload is not JSON, is not
/// an array, or contains a non-object item.
pub fn products_from_json(
    content: &str,
    category: &str,
) -> Result<Vec<CanonicalProduct>, DealError> {
    let invalid = |reason: String| {
        DealError::InvalidProducts(format!(
            "content must be the products array from fetch_page: {reason}"
        ))
    };

    let parsed: Value = serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;
    let Value::Array(items) = parsed else {
        return Err(invalid("not an array".to_string()));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(fields) => Ok(coerce_product(fields, category)),
            _ => Err(invalid(format!("item {i} is not an object"))),
        })
        .collect()
}

/// Parses the deals array passed to `save_deals`.
///
/// # Errors
///
/// Returns [`DealError::InvalidDeals`] if the payload does not deserialize
/// into deals, or [`DealError::InputMissing`] if the array is empty.
pub fn deals_from_json(content: &str) -> Result<Vec<Deal>, DealError> {
    let deals: Vec<Deal> = serde_json::from_str(content).map_err(|e| {
        DealError::InvalidDeals(format!("deals must be a valid JSON array string: {e}"))
    })?;
    if deals.is_empty() {
        return Err(DealError::InputMissing { field: "deals" });
    }
    Ok(deals)
}

fn coerce_product(fields: &Map<String, Value>, category: &str) -> CanonicalProduct {
    let text = |key: &str, default: &str| -> String {
        match fields.get(key) {
            None | Some(Value::Null) => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    };
    let price = |key: &str| fields.get(key).and_then(coerce_price);
    let source_id = match fields.get("sourceId") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    CanonicalProduct {
        name: text("name", UNKNOWN_PRODUCT_NAME),
        category: text("category", category),
        original_price: price("originalPrice"),
        sale_price: price("salePrice"),
        currency: text("currency", DEFAULT_CURRENCY),
        image_url: text("imageUrl", ""),
        product_url: text("productUrl", ""),
        source_id,
    }
}

/// Number or fully numeric string; blank and non-numeric strings are `None`.
fn coerce_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

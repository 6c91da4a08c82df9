//! Path combinators over semi-structured JSON.
//!
//! Retailer payloads nest optional fields several levels deep. Every lookup
//! here takes a JSON pointer (`"/prices/currentPrice"`) and degrades to
//! `None` or an empty slice when any segment is missing, so normalizers can
//! chain fallbacks with `or_else` instead of matching on each level.

use serde_json::Value;

pub trait ValueExt {
    /// Value at `pointer`, treating JSON `null` as absent.
    fn at(&self, pointer: &str) -> Option<&Value>;

    /// Non-empty string at `pointer`.
    fn str_at(&self, pointer: &str) -> Option<&str>;

    /// First non-empty string among `pointers`, tried in order.
    fn first_str(&self, pointers: &[&str]) -> Option<&str>;

    /// Numeric value at `pointer`; numeric strings are accepted. See
    /// [`parse_price`].
    fn price_at(&self, pointer: &str) -> Option<f64>;

    /// Array elements at `pointer`, or an empty slice.
    fn items_at(&self, pointer: &str) -> &[Value];

    /// Identifier at the first of `pointers` holding a non-empty string or a
    /// number.
    fn id_at(&self, pointers: &[&str]) -> Option<String>;

    /// Whether `@type` is `type_name`, either as a plain string or as one
    /// element of an array of types.
    fn has_type(&self, type_name: &str) -> bool;
}

impl ValueExt for Value {
    fn at(&self, pointer: &str) -> Option<&Value> {
        self.pointer(pointer).filter(|v| !v.is_null())
    }

    fn str_at(&self, pointer: &str) -> Option<&str> {
        self.at(pointer)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    fn first_str(&self, pointers: &[&str]) -> Option<&str> {
        pointers.iter().find_map(|p| self.str_at(p))
    }

    fn price_at(&self, pointer: &str) -> Option<f64> {
        self.at(pointer).and_then(parse_price)
    }

    fn items_at(&self, pointer: &str) -> &[Value] {
        self.at(pointer)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn id_at(&self, pointers: &[&str]) -> Option<String> {
        pointers.iter().find_map(|p| match self.at(p)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    fn has_type(&self, type_name: &str) -> bool {
        match self.get("@type") {
            Some(Value::String(s)) => s == type_name,
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .any(|s| s == type_name),
            _ => false,
        }
    }
}

/// Treats a single value as a one-element list, an array as its elements,
/// and `null`/absence as nothing.
#[must_use]
pub fn as_entries(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Interprets a JSON number or numeric string as a price.
///
/// Strings are read like a lenient float parse: leading whitespace is
/// skipped, then the longest numeric prefix is taken (`"40.00 USD"` → `40.0`).
/// Thousands separators between digits are ignored (`"1,299.00"` → `1299.0`).
/// Anything that yields no digits, or a non-finite value, is `None`.
#[must_use]
pub fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_numeric_prefix(s),
        _ => None,
    }
}

fn parse_numeric_prefix(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut digits = String::with_capacity(bytes.len());
    let mut i = 0usize;
    let mut has_dot = false;
    let mut has_digit = false;

    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
        digits.push(char::from(bytes[i]));
        i += 1;
    }

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_digit() {
            digits.push(char::from(b));
            has_digit = true;
        } else if b == b'.' && !has_dot {
            digits.push('.');
            has_dot = true;
        } else if b == b','
            && has_digit
            && !has_dot
            && i + 1 < bytes.len()
            && bytes[i + 1].is_ascii_digit()
        {
            // thousands separator
        } else {
            break;
        }
        i += 1;
    }

    if !has_digit {
        return None;
    }
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

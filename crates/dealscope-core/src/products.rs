use serde::{Deserialize, Serialize};

/// Currency assumed when a source does not state one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Name used when a source record carries no usable title.
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown";

/// A retailer-agnostic product record produced by every extraction strategy.
///
/// A missing price is `None`, never `0.0` or NaN. A product with neither
/// price is still valid; it simply cannot become a [`Deal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalProduct {
    pub name: String,
    pub category: String,
    pub original_price: Option<f64>,
    pub sale_price: Option<f64>,
    pub currency: String,
    pub image_url: String,
    pub product_url: String,
    /// Retailer-assigned product identifier, when the source exposes one
    /// (schema.org `sku`/`productID`, Nike `globalProductId`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl CanonicalProduct {
    /// Creates a product with no prices, default currency, and empty URLs.
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            original_price: None,
            sale_price: None,
            currency: DEFAULT_CURRENCY.to_string(),
            image_url: String::new(),
            product_url: String::new(),
            source_id: None,
        }
    }
}

/// A product that cleared the discount threshold.
///
/// Deals are created fresh per computation and never mutated afterwards.
/// `sale_price < original_price` always holds, and both are positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub name: String,
    pub category: String,
    pub retailer: String,
    pub original_price: f64,
    pub sale_price: f64,
    /// Discount rounded to one decimal place, e.g. `23.0`.
    pub discount_pct: f64,
    pub image_url: String,
    pub product_url: String,
}

impl Deal {
    /// Persistence partition key: `"{retailer}#{category}"`.
    #[must_use]
    pub fn partition_key(&self) -> String {
        format!("{}#{}", self.retailer, self.category)
    }
}

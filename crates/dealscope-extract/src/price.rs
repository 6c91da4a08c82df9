//! Offer price reconciliation.
//!
//! schema.org pages describe prices as one offer, a list of offers, or an
//! offer carrying nested price specifications. This module folds all of
//! them into a single `(sale, original, currency)` triple.
//!
//! Rules are applied per entry, in array order:
//! 1. `AggregateOffer`: `lowPrice` is the sale price, `highPrice` the original.
//! 2. `priceType` of `SalePrice` / `ListPrice` sets sale / original.
//! 3. `priceSpecification` entries are matched on a case-insensitive
//!    `sale` / `list` substring of their `@type` (or `priceType`).
//! 4. A plain `price` is taken as the sale price only if none is set yet.
//!
//! Rules 1–3 overwrite whatever was set before; rule 4 never does. An
//! untyped price seen first therefore survives unless a later labeled entry
//! replaces it.

use dealscope_core::DEFAULT_CURRENCY;
use serde_json::Value;

use crate::path::{as_entries, ValueExt};

#[derive(Debug, Clone, PartialEq)]
pub struct PriceResolution {
    pub sale: Option<f64>,
    pub original: Option<f64>,
    pub currency: String,
}

impl Default for PriceResolution {
    fn default() -> Self {
        Self {
            sale: None,
            original: None,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// Resolves sale price, original price, and currency from an `offers` value.
///
/// `offers` may be a single object, an array of objects, or absent. Entries
/// that are not objects are ignored. Currency comes from the first entry that
/// states one.
#[must_use]
pub fn reconcile_offers(offers: Option<&Value>) -> PriceResolution {
    let mut sale: Option<f64> = None;
    let mut original: Option<f64> = None;
    let mut currency: Option<&str> = None;

    for offer in as_entries(offers) {
        if !offer.is_object() {
            continue;
        }

        if currency.is_none() {
            currency = offer.str_at("/priceCurrency");
        }

        if offer.has_type("AggregateOffer") {
            if let Some(low) = offer.price_at("/lowPrice") {
                sale = Some(low);
            }
            if let Some(high) = offer.price_at("/highPrice") {
                original = Some(high);
            }
            continue;
        }

        let label = offer.str_at("/priceType");
        let price = offer.price_at("/price");

        if let (Some(label), Some(price)) = (label, price) {
            if is_schema_label(label, "SalePrice") {
                sale = Some(price);
                continue;
            }
            if is_schema_label(label, "ListPrice") {
                original = Some(price);
                continue;
            }
        }

        if let Some(specs) = offer.at("/priceSpecification") {
            for spec in as_entries(Some(specs)) {
                let Some(spec_price) = spec.price_at("/price") else {
                    continue;
                };
                let spec_label = specification_label(spec);
                if spec_label.contains("sale") {
                    sale = Some(spec_price);
                }
                if spec_label.contains("list") {
                    original = Some(spec_price);
                }
            }
            continue;
        }

        if sale.is_none() {
            sale = price;
        }
    }

    PriceResolution {
        sale,
        original,
        currency: currency.map_or_else(|| DEFAULT_CURRENCY.to_string(), str::to_string),
    }
}

/// `SalePrice` matches both the bare label and the full
/// `https://schema.org/SalePrice` form.
fn is_schema_label(label: &str, expected: &str) -> bool {
    label == expected
        || label
            .strip_suffix(expected)
            .is_some_and(|prefix| prefix.ends_with('/'))
}

/// Lowercased label of a nested price specification. `@type` wins; when it
/// names neither a sale nor a list price, `priceType` is used instead.
fn specification_label(spec: &Value) -> String {
    let type_label = spec.str_at("/@type").unwrap_or_default().to_lowercase();
    if type_label.contains("sale") || type_label.contains("list") {
        return type_label;
    }
    spec.str_at("/priceType")
        .map_or(type_label, str::to_lowercase)
}

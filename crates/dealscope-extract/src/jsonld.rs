//! schema.org JSON-LD product extraction.

use std::sync::LazyLock;

use dealscope_core::{CanonicalProduct, UNKNOWN_PRODUCT_NAME};
use regex::Regex;
use serde_json::Value;

use crate::path::{as_entries, ValueExt};
use crate::price::reconcile_offers;

static LD_JSON_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<script\b[^>]*\btype\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#,
    )
    .expect("valid regex")
});

/// Extracts products from every `<script type="application/ld+json">` block
/// in `html`.
///
/// Blocks that fail to parse are skipped. Top-level arrays and `@graph`
/// containers are flattened. `Product` items yield one product each;
/// `ItemList` items yield one per `Product` element. Output follows document
/// order.
#[must_use]
pub fn extract_structured_products(html: &str, category: &str) -> Vec<CanonicalProduct> {
    let mut products = Vec::new();

    for (index, cap) in LD_JSON_SCRIPT_RE.captures_iter(html).enumerate() {
        let Some(body) = cap.get(1) else {
            continue;
        };

        let value: Value = match serde_json::from_str(body.as_str().trim()) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(block = index, error = %e, "skipping malformed JSON-LD block");
                continue;
            }
        };

        for item in flatten_block(&value) {
            collect_item(item, category, &mut products);
        }
    }

    products
}

/// Top-level candidates of one block: the block itself (or its elements when
/// it is an array), with any `@graph` members appended in place.
fn flatten_block(value: &Value) -> Vec<&Value> {
    let mut items = Vec::new();
    for entry in as_entries(Some(value)) {
        match entry.get("@graph").and_then(Value::as_array) {
            Some(graph) => items.extend(graph.iter()),
            None => items.push(entry),
        }
    }
    items
}

fn collect_item(item: &Value, category: &str, out: &mut Vec<CanonicalProduct>) {
    if item.has_type("Product") {
        out.push(to_canonical(item, category));
        return;
    }

    if item.has_type("ItemList") {
        for element in item.items_at("/itemListElement") {
            let inner = element.at("/item").unwrap_or(element);
            if inner.has_type("Product") {
                out.push(to_canonical(inner, category));
            }
        }
    }
}

fn to_canonical(item: &Value, category: &str) -> CanonicalProduct {
    let prices = reconcile_offers(item.at("/offers"));

    CanonicalProduct {
        name: item
            .str_at("/name")
            .unwrap_or(UNKNOWN_PRODUCT_NAME)
            .to_string(),
        category: category.to_string(),
        original_price: prices.original,
        sale_price: prices.sale,
        currency: prices.currency,
        image_url: resolve_image(item.at("/image")),
        product_url: item.str_at("/url").unwrap_or_default().to_string(),
        source_id: item.id_at(&["/sku", "/productID"]),
    }
}

/// `image` may be a URL string, a list of URLs, or an `ImageObject`.
fn resolve_image(image: Option<&Value>) -> String {
    match image {
        Some(Value::String(url)) => url.clone(),
        Some(Value::Array(urls)) => urls
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(obj @ Value::Object(_)) => obj.str_at("/url").unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

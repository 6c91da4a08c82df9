//! Normalizers for retailer JSON feeds fetched directly.

use dealscope_core::{ApiNormalizer, ApiProfile, CanonicalProduct, DEFAULT_CURRENCY};
use serde_json::Value;

use crate::embedded_state::join_title;
use crate::path::ValueExt;

const COUNTRY_LANG_PLACEHOLDER: &str = "{countryLang}";

/// Normalizes a parsed feed using the profile's feed normalizer.
///
/// An empty result is not an error, but it usually means the upstream
/// payload changed shape, so it is logged at warn.
#[must_use]
pub fn normalize_feed(api: &ApiProfile, feed: &Value, category: &str) -> Vec<CanonicalProduct> {
    let products = match api.normalizer {
        ApiNormalizer::NikeProductFeed => normalize_nike_feed(feed, category, &api.site_origin),
    };

    if products.is_empty() {
        tracing::warn!(
            normalizer = ?api.normalizer,
            "direct feed produced no products; upstream shape may have changed"
        );
    }

    products
}

/// Reads `data.products.products[]`.
fn normalize_nike_feed(feed: &Value, category: &str, site_origin: &str) -> Vec<CanonicalProduct> {
    feed.items_at("/data/products/products")
        .iter()
        .map(|p| CanonicalProduct {
            name: join_title(p.str_at("/title"), p.str_at("/subtitle")),
            category: category.to_string(),
            original_price: p.price_at("/price/fullPrice"),
            sale_price: p.price_at("/price/currentPrice"),
            currency: p
                .str_at("/price/currency")
                .unwrap_or(DEFAULT_CURRENCY)
                .to_string(),
            image_url: p
                .first_str(&["/images/portraitURL", "/images/squarishURL"])
                .unwrap_or_default()
                .to_string(),
            product_url: p
                .str_at("/url")
                .map(|url| absolutize_url(url, site_origin))
                .unwrap_or_default(),
            source_id: p.id_at(&["/id", "/cloudProductId"]),
        })
        .collect()
}

/// Strips the locale placeholder and prefixes relative paths with `origin`.
fn absolutize_url(url: &str, origin: &str) -> String {
    let cleaned = url
        .replace(&format!("/{COUNTRY_LANG_PLACEHOLDER}"), "")
        .replace(COUNTRY_LANG_PLACEHOLDER, "");
    if cleaned.starts_with("http://") || cleaned.starts_with("https://") {
        return cleaned;
    }
    if cleaned.starts_with("//") {
        return format!("https:{cleaned}");
    }

    let origin = origin.trim_end_matches('/');
    if cleaned.starts_with('/') {
        format!("{origin}{cleaned}")
    } else {
        format!("{origin}/{cleaned}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn nike_api() -> ApiProfile {
        ApiProfile {
            normalizer: ApiNormalizer::NikeProductFeed,
            site_origin: "https://www.nike.com".to_string(),
        }
    }

    #[test]
    fn nike_feed_maps_prices_urls_and_ids() {
        let feed = json!({"data": {"products": {"products": [{
            "id": "feed-1",
            "cloudProductId": "cloud-1",
            "title": "Pegasus 41",
            "subtitle": "Road Running Shoes",
            "price": {"currentPrice": 99.99, "fullPrice": 140, "currency": "USD"},
            "url": "{countryLang}/t/pegasus-41",
            "images": {"squarishURL": "https://img/sq.png"}
        }]}}});

        let products = normalize_feed(&nike_api(), &feed, "running");
        assert_eq!(products.len(), 1);
        let p = &products[0];
        assert_eq!(p.name, "Pegasus 41 — Road Running Shoes");
        assert_eq!(p.sale_price, Some(99.99));
        assert_eq!(p.original_price, Some(140.0));
        assert_eq!(p.product_url, "https://www.nike.com/t/pegasus-41");
        assert_eq!(p.image_url, "https://img/sq.png");
        assert_eq!(p.source_id.as_deref(), Some("feed-1"));
    }

    #[test]
    fn nike_feed_tolerates_numeric_strings_and_missing_fields() {
        let feed = json!({"data": {"products": {"products": [
            {"price": {"currentPrice": "59.97", "fullPrice": "85"}, "cloudProductId": "c-2"},
            {}
        ]}}});

        let products = normalize_feed(&nike_api(), &feed, "c");
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].sale_price, Some(59.97));
        assert_eq!(products[0].original_price, Some(85.0));
        assert_eq!(products[0].source_id.as_deref(), Some("c-2"));
        assert_eq!(products[1].name, "Unknown");
        assert!(products[1].product_url.is_empty());
        assert_eq!(products[1].currency, "USD");
    }

    #[test]
    fn unexpected_feed_shape_yields_empty() {
        let feed = json!({"objects": []});
        assert!(normalize_feed(&nike_api(), &feed, "c").is_empty());
    }

    #[test]
    fn absolutize_url_variants() {
        let origin = "https://www.nike.com/";
        assert_eq!(absolutize_url("/t/x", origin), "https://www.nike.com/t/x");
        assert_eq!(absolutize_url("t/x", origin), "https://www.nike.com/t/x");
        assert_eq!(
            absolutize_url("https://www.nike.com/{countryLang}/t/x", origin),
            "https://www.nike.com/t/x"
        );
        assert_eq!(
            absolutize_url("//cdn.nike.com/a", origin),
            "https://cdn.nike.com/a"
        );
    }
}

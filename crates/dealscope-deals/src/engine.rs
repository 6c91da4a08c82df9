//! Discount computation over canonical products.

use std::collections::HashSet;

use dealscope_core::{CanonicalProduct, Deal};
use uuid::Uuid;

/// One independent unit of work for [`compute_batch`].
#[derive(Debug, Clone)]
pub struct DealRequest {
    pub retailer: String,
    pub category: String,
    pub threshold_pct: f64,
    pub products: Vec<CanonicalProduct>,
}

/// Discount as a percentage rounded to one decimal place.
///
/// Rounding is half-up on the per-mille value: `(1 - sale / original)` is
/// scaled by 1000, rounded to an integer, then divided by 10. So 100 → 77 is
/// `23.0` and 99.99 → 49.99 is `50.0`.
#[must_use]
pub fn discount_pct(original: f64, sale: f64) -> f64 {
    ((1.0 - sale / original) * 1000.0).round() / 10.0
}

/// Turns products into deals whose discount is at least `threshold_pct`.
///
/// A product is skipped when either price is missing, non-positive, or
/// non-finite, or when the sale price is not strictly below the original.
/// Output keeps input order. Products are neither sorted nor deduplicated.
///
/// A deal takes its product's `source_id` as its id unless an earlier deal
/// in the same call already used it; otherwise it gets a fresh UUID v4.
#[must_use]
pub fn compute_deals(
    products: &[CanonicalProduct],
    retailer: &str,
    category: &str,
    threshold_pct: f64,
) -> Vec<Deal> {
    let mut used_ids: HashSet<&str> = HashSet::new();
    let deals: Vec<Deal> = products
        .iter()
        .filter_map(|p| qualify(p, retailer, category, threshold_pct, &mut used_ids))
        .collect();

    tracing::info!(
        retailer,
        category,
        threshold_pct,
        products = products.len(),
        deals = deals.len(),
        "computed deals"
    );

    deals
}

/// Computes each request independently. Results are in request order.
#[must_use]
pub fn compute_batch(requests: &[DealRequest]) -> Vec<Vec<Deal>> {
    requests
        .iter()
        .map(|r| compute_deals(&r.products, &r.retailer, &r.category, r.threshold_pct))
        .collect()
}

fn qualify<'a>(
    product: &'a CanonicalProduct,
    retailer: &str,
    category: &str,
    threshold_pct: f64,
    used_ids: &mut HashSet<&'a str>,
) -> Option<Deal> {
    let original = product.original_price.filter(|v| is_usable_price(*v))?;
    let sale = product.sale_price.filter(|v| is_usable_price(*v))?;
    if sale >= original {
        return None;
    }

    let pct = discount_pct(original, sale);
    if pct < threshold_pct {
        return None;
    }

    let category = if product.category.is_empty() {
        category
    } else {
        product.category.as_str()
    };

    let id = match product.source_id.as_deref() {
        Some(source_id) if used_ids.insert(source_id) => source_id.to_string(),
        _ => Uuid::new_v4().to_string(),
    };

    Some(Deal {
        id,
        name: product.name.clone(),
        category: category.to_string(),
        retailer: retailer.to_string(),
        original_price: original,
        sale_price: sale,
        discount_pct: pct,
        image_url: product.image_url.clone(),
        product_url: product.product_url.clone(),
    })
}

fn is_usable_price(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, original: Option<f64>, sale: Option<f64>) -> CanonicalProduct {
        CanonicalProduct {
            original_price: original,
            sale_price: sale,
            ..CanonicalProduct::new(name, "shoes")
        }
    }

    fn assert_pct(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn equal_prices_are_not_deals() {
        let deals = compute_deals(&[product("a", Some(50.0), Some(50.0))], "rei", "c", 0.0);
        assert!(deals.is_empty());
    }

    #[test]
    fn inverted_prices_are_not_deals() {
        let deals = compute_deals(&[product("a", Some(40.0), Some(50.0))], "rei", "c", 0.0);
        assert!(deals.is_empty());
    }

    #[test]
    fn per_mille_rounding() {
        assert_pct(discount_pct(100.0, 77.0), 23.0);
        assert_pct(discount_pct(99.99, 49.99), 50.0);
        assert_pct(discount_pct(100.0, 40.0), 60.0);
        assert_pct(discount_pct(80.0, 59.99), 25.0);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let products = [
            product("at", Some(100.0), Some(70.0)),
            product("below", Some(100.0), Some(70.1)),
        ];
        let deals = compute_deals(&products, "rei", "c", 30.0);
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].name, "at");
        assert_pct(deals[0].discount_pct, 30.0);
    }

    #[test]
    fn missing_and_invalid_prices_are_skipped() {
        let products = [
            product("no sale", Some(100.0), None),
            product("no original", None, Some(10.0)),
            product("zero", Some(0.0), Some(0.0)),
            product("negative sale", Some(100.0), Some(-5.0)),
            product("nan", Some(f64::NAN), Some(10.0)),
            product("inf", Some(f64::INFINITY), Some(10.0)),
        ];
        assert!(compute_deals(&products, "rei", "c", 0.0).is_empty());
    }

    #[test]
    fn deal_fields_are_carried_over() {
        let mut p = product("Trail Runner", Some(100.0), Some(40.0));
        p.image_url = "https://img/x.png".to_string();
        p.product_url = "https://shop/x".to_string();
        p.source_id = Some("sku-9".to_string());

        let deals = compute_deals(&[p], "rei", "fallback", 30.0);
        let d = &deals[0];
        assert_eq!(d.id, "sku-9");
        assert_eq!(d.retailer, "rei");
        assert_eq!(d.category, "shoes");
        assert_eq!(d.image_url, "https://img/x.png");
        assert_eq!(d.product_url, "https://shop/x");
        assert_pct(d.original_price, 100.0);
        assert_pct(d.sale_price, 40.0);
        assert_pct(d.discount_pct, 60.0);
    }

    #[test]
    fn empty_product_category_falls_back_to_caller() {
        let p = CanonicalProduct {
            original_price: Some(100.0),
            sale_price: Some(50.0),
            ..CanonicalProduct::new("x", "")
        };
        let deals = compute_deals(&[p], "rei", "jackets", 30.0);
        assert_eq!(deals[0].category, "jackets");
    }

    #[test]
    fn generated_ids_are_unique_per_occurrence() {
        let p = product("dup", Some(100.0), Some(50.0));
        let deals = compute_deals(&[p.clone(), p], "rei", "c", 30.0);
        assert_eq!(deals.len(), 2, "duplicates are not removed");
        assert_ne!(deals[0].id, deals[1].id);
        assert!(Uuid::parse_str(&deals[0].id).is_ok());
    }

    #[test]
    fn repeated_source_id_gets_a_fresh_id() {
        let mut p = product("wall tile", Some(100.0), Some(50.0));
        p.source_id = Some("gp-1".to_string());
        let mut below = product("below threshold", Some(100.0), Some(90.0));
        below.source_id = Some("gp-2".to_string());
        let mut other = product("other", Some(100.0), Some(40.0));
        other.source_id = Some("gp-2".to_string());

        let deals = compute_deals(&[p.clone(), below, p, other], "nike", "c", 30.0);
        assert_eq!(deals.len(), 3);
        assert_eq!(deals[0].id, "gp-1");
        assert_ne!(deals[1].id, "gp-1");
        assert!(Uuid::parse_str(&deals[1].id).is_ok());
        assert_eq!(deals[2].id, "gp-2", "skipped products do not claim ids");
    }

    #[test]
    fn output_preserves_input_order() {
        let products = [
            product("small", Some(100.0), Some(65.0)),
            product("big", Some(100.0), Some(10.0)),
            product("mid", Some(100.0), Some(50.0)),
        ];
        let names: Vec<String> = compute_deals(&products, "rei", "c", 30.0)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["small", "big", "mid"]);
    }

    #[test]
    fn batch_requests_do_not_share_thresholds() {
        let products = vec![
            product("forty off", Some(100.0), Some(60.0)),
            product("sixty off", Some(100.0), Some(40.0)),
        ];
        let requests = [
            DealRequest {
                retailer: "rei".to_string(),
                category: "shoes".to_string(),
                threshold_pct: 30.0,
                products: products.clone(),
            },
            DealRequest {
                retailer: "patagonia".to_string(),
                category: "jackets".to_string(),
                threshold_pct: 50.0,
                products,
            },
        ];

        let results = compute_batch(&requests);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].len(), 2);
        assert!(results[0].iter().all(|d| d.retailer == "rei"));
        assert_eq!(results[1].len(), 1);
        assert_eq!(results[1][0].name, "sixty off");
        assert_eq!(results[1][0].retailer, "patagonia");
    }
}

//! Framework server-state (`__NEXT_DATA__`) extraction.
//!
//! Pages rendered by Next.js ship their initial store as a JSON blob. The
//! store root lives at `props.pageProps.initialState`; which normalizer
//! applies is decided by the root's top-level keys.

use std::sync::LazyLock;

use dealscope_core::{CanonicalProduct, StateNormalizer, DEFAULT_CURRENCY, UNKNOWN_PRODUCT_NAME};
use regex::Regex;
use serde_json::Value;

use crate::path::ValueExt;

static NEXT_DATA_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\b[^>]*\bid\s*=\s*["']__NEXT_DATA__["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

const STATE_ROOT_POINTER: &str = "/props/pageProps/initialState";

/// Joins the non-empty parts of a two-part product title.
pub(crate) const TITLE_SEPARATOR: &str = " — ";

/// Extracts products from the page's embedded server state.
///
/// Returns an empty list when the blob is missing, is not valid JSON, has no
/// state root, or has a root no normalizer recognizes.
#[must_use]
pub fn extract_embedded_state_products(html: &str, category: &str) -> Vec<CanonicalProduct> {
    let Some(blob) = NEXT_DATA_SCRIPT_RE
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
    else {
        return Vec::new();
    };

    let data: Value = match serde_json::from_str(blob) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "embedded state blob is not valid JSON");
            return Vec::new();
        }
    };

    let Some(root) = locate_state_root(&data) else {
        tracing::debug!("embedded state has no initialState root");
        return Vec::new();
    };

    let Some(normalizer) = detect_state_normalizer(root) else {
        tracing::debug!("embedded state root matches no known shape");
        return Vec::new();
    };

    match normalizer {
        StateNormalizer::NikeWall => normalize_nike_wall(root, category),
    }
}

fn locate_state_root(data: &Value) -> Option<&Value> {
    data.at(STATE_ROOT_POINTER).filter(|root| root.is_object())
}

fn detect_state_normalizer(root: &Value) -> Option<StateNormalizer> {
    StateNormalizer::ALL
        .into_iter()
        .find(|n| root.at(&format!("/{}", n.marker_key())).is_some())
}

/// Flattens `Wall.productGroupings[].products[]` into canonical products.
fn normalize_nike_wall(root: &Value, category: &str) -> Vec<CanonicalProduct> {
    root.items_at("/Wall/productGroupings")
        .iter()
        .flat_map(|group| group.items_at("/products"))
        .map(|p| CanonicalProduct {
            name: join_title(p.str_at("/copy/title"), p.str_at("/copy/subTitle")),
            category: category.to_string(),
            original_price: p.price_at("/prices/initialPrice"),
            sale_price: p.price_at("/prices/currentPrice"),
            currency: p
                .str_at("/prices/currency")
                .unwrap_or(DEFAULT_CURRENCY)
                .to_string(),
            image_url: p
                .first_str(&[
                    "/colorwayImages/portraitURL",
                    "/colorwayImages/squarishURL",
                ])
                .unwrap_or_default()
                .to_string(),
            product_url: p.str_at("/pdpUrl/url").unwrap_or_default().to_string(),
            source_id: p.id_at(&["/globalProductId", "/productCode"]),
        })
        .collect()
}

/// `"Title — Subtitle"`, either part alone, or `"Unknown"`.
pub(crate) fn join_title(title: Option<&str>, subtitle: Option<&str>) -> String {
    let joined = [title, subtitle]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(TITLE_SEPARATOR);
    if joined.is_empty() {
        UNKNOWN_PRODUCT_NAME.to_string()
    } else {
        joined
    }
}

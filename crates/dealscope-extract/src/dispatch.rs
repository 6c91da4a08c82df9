//! Chooses and runs extraction strategies for a retailer.

use dealscope_core::{CanonicalProduct, Retailer, RetailerProfile, RetailerRegistry, Strategy};
use serde_json::Value;

use crate::direct_api::normalize_feed;
use crate::embedded_state::extract_embedded_state_products;
use crate::error::ExtractError;
use crate::jsonld::extract_structured_products;

/// HTML strategies in the order they are attempted, whatever order a
/// profile lists them in.
const HTML_STRATEGY_ORDER: [Strategy; 2] = [Strategy::StructuredData, Strategy::EmbeddedState];

/// Fetched content, already classified as markup or a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum RawContent {
    Html(String),
    Json(Value),
}

impl RawContent {
    /// Classifies a response body.
    ///
    /// A content type mentioning `json` means the body must parse as JSON.
    /// Without a content type, a body that looks like and parses as JSON is
    /// treated as JSON; anything else is HTML.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidJson`] if the content type declares JSON
    /// but the body does not parse.
    pub fn classify(
        body: String,
        content_type: Option<&str>,
        source: &str,
    ) -> Result<Self, ExtractError> {
        match content_type {
            Some(ct) if ct.to_ascii_lowercase().contains("json") => serde_json::from_str(&body)
                .map(RawContent::Json)
                .map_err(|e| ExtractError::InvalidJson {
                    context: source.to_string(),
                    source: e,
                }),
            Some(_) => Ok(RawContent::Html(body)),
            None => Ok(Self::sniff(body)),
        }
    }

    /// Best-effort classification of a body with no declared type.
    #[must_use]
    pub fn sniff(body: String) -> Self {
        let trimmed = body.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str(trimmed) {
                return RawContent::Json(value);
            }
        }
        RawContent::Html(body)
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RawContent::Html(_) => "html",
            RawContent::Json(_) => "json",
        }
    }
}

/// Products produced by the first strategy that found any.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub strategy: Strategy,
    pub products: Vec<CanonicalProduct>,
}

/// Runs the retailer's applicable strategies against `raw` and returns the
/// first non-empty result.
///
/// # Errors
///
/// - [`ExtractError::UnknownRetailer`] if the retailer has no profile.
/// - [`ExtractError::NoProductData`] if every applicable strategy came back
///   empty.
pub fn extract_products(
    registry: &RetailerRegistry,
    raw: &RawContent,
    retailer: &Retailer,
    category: &str,
) -> Result<Extraction, ExtractError> {
    let profile = registry
        .profile(retailer)
        .ok_or_else(|| ExtractError::UnknownRetailer {
            retailer: retailer.to_string(),
        })?;

    let mut tried: Vec<Strategy> = Vec::new();

    for strategy in applicable_strategies(profile, raw) {
        tried.push(strategy);
        let products = run_strategy(profile, strategy, raw, category);
        if products.is_empty() {
            tracing::debug!(
                retailer = %retailer,
                strategy = %strategy,
                "strategy found no products"
            );
            continue;
        }

        tracing::info!(
            retailer = %retailer,
            category,
            strategy = %strategy,
            count = products.len(),
            "extracted products"
        );
        return Ok(Extraction { strategy, products });
    }

    let tried = if tried.is_empty() {
        "none".to_string()
    } else {
        tried
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    tracing::warn!(
        retailer = %retailer,
        content = raw.kind(),
        tried = %tried,
        "no product data found"
    );
    Err(ExtractError::NoProductData {
        retailer: retailer.to_string(),
        tried,
    })
}

fn applicable_strategies(profile: &RetailerProfile, raw: &RawContent) -> Vec<Strategy> {
    match raw {
        RawContent::Html(_) => HTML_STRATEGY_ORDER
            .into_iter()
            .filter(|s| profile.supports(*s))
            .collect(),
        RawContent::Json(_) if profile.supports(Strategy::DirectApi) && profile.api.is_some() => {
            vec![Strategy::DirectApi]
        }
        RawContent::Json(_) => Vec::new(),
    }
}

fn run_strategy(
    profile: &RetailerProfile,
    strategy: Strategy,
    raw: &RawContent,
    category: &str,
) -> Vec<CanonicalProduct> {
    match (strategy, raw) {
        (Strategy::StructuredData, RawContent::Html(html)) => {
            extract_structured_products(html, category)
        }
        (Strategy::EmbeddedState, RawContent::Html(html)) => {
            extract_embedded_state_products(html, category)
        }
        (Strategy::DirectApi, RawContent::Json(feed)) => profile
            .api
            .as_ref()
            .map(|api| normalize_feed(api, feed, category))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

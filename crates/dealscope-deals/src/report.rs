//! JSON result bodies returned by the tools.
//!
//! Every tool answers with a JSON string. Successful calls serialize one of
//! the report structs below; failures serialize as
//! `{"success": false, "error": "..."}` via [`failure_json`].

use dealscope_core::{CanonicalProduct, Deal, Strategy};
use serde::Serialize;
use serde_json::json;

/// Result of `fetch_page`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchReport {
    pub success: bool,
    pub url: String,
    pub retailer: String,
    pub category: String,
    pub strategy: Strategy,
    pub product_count: usize,
    pub products: Vec<CanonicalProduct>,
    pub raw_length: usize,
    pub content_type: Option<String>,
}

/// Result of `parse_deals`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealReport {
    pub success: bool,
    pub retailer: String,
    pub category: String,
    pub deals_found: usize,
    pub deals: Vec<Deal>,
}

impl DealReport {
    #[must_use]
    pub fn new(retailer: &str, category: &str, deals: Vec<Deal>) -> Self {
        Self {
            success: true,
            retailer: retailer.to_string(),
            category: category.to_string(),
            deals_found: deals.len(),
            deals,
        }
    }
}

/// Result of `save_deals`. `success` is false whenever any chunk reported an
/// error, even if most deals were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub success: bool,
    pub saved: usize,
    pub total: usize,
    pub errors: Vec<String>,
}

/// Serializes a tool failure.
#[must_use]
pub fn failure_json(message: &str) -> String {
    json!({"success": false, "error": message}).to_string()
}

/// Serializes a report, degrading to a failure body if serialization fails.
#[must_use]
pub fn to_json<T: Serialize>(report: &T) -> String {
    serde_json::to_string(report)
        .unwrap_or_else(|e| failure_json(&format!("failed to serialize result: {e}")))
}

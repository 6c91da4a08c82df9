//! The three agent tools: `fetch_page`, `parse_deals`, `save_deals`.
//!
//! Every tool takes the folded string parameters and answers with a JSON
//! body. Expected failures (missing parameters, fetch errors, unparseable
//! content) come back as `{"success": false, "error": ...}` in `Ok`. Only
//! infrastructure failures such as an unreachable database surface as `Err`.

use std::collections::HashMap;

use dealscope_core::{AppConfig, Deal, Retailer, RetailerRegistry};
use dealscope_deals::{
    compute_deals, deals_from_json, failure_json, products_from_json, save_deals, to_json,
    DealError, DealReport, DealWriter, FetchReport,
};
use dealscope_extract::{extract_products, PageFetcher};

pub(crate) type Params = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tool {
    FetchPage,
    ParseDeals,
    SaveDeals,
}

impl Tool {
    pub(crate) const ALL: [Tool; 3] = [Tool::FetchPage, Tool::ParseDeals, Tool::SaveDeals];

    pub(crate) fn name(self) -> &'static str {
        match self {
            Tool::FetchPage => "fetch_page",
            Tool::ParseDeals => "parse_deals",
            Tool::SaveDeals => "save_deals",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Comma-separated tool names, in dispatch order.
    pub(crate) fn available() -> String {
        Self::ALL.map(Tool::name).join(", ")
    }
}

/// Everything a tool call needs, built once per process.
pub(crate) struct ToolContext {
    pub(crate) config: AppConfig,
    pub(crate) registry: RetailerRegistry,
    pub(crate) fetcher: PageFetcher,
}

impl ToolContext {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub(crate) fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let fetcher = PageFetcher::from_config(&config)
            .map_err(|e| anyhow::anyhow!("failed to build page fetcher: {e}"))?;
        Ok(Self {
            config,
            registry: RetailerRegistry::builtin(),
            fetcher,
        })
    }

    pub(crate) async fn call(&self, tool: Tool, params: &Params) -> anyhow::Result<String> {
        match tool {
            Tool::FetchPage => Ok(self.fetch_page(params).await),
            Tool::ParseDeals => Ok(self.parse_deals(params)),
            Tool::SaveDeals => self.save_deals(params).await,
        }
    }

    /// Fetches `url` and extracts canonical products for `retailer`.
    pub(crate) async fn fetch_page(&self, params: &Params) -> String {
        let (url, retailer) = match (required(params, "url"), required(params, "retailer")) {
            (Ok(url), Ok(retailer)) => (url, retailer),
            (Err(e), _) | (_, Err(e)) => return failure_json(&e.to_string()),
        };
        let category = optional(params, "category");

        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(url, retailer, error = %e, "fetch_page failed");
                return failure_json(&format!("Failed to fetch {url}: {e}"));
            }
        };

        let raw_length = page.raw_length();
        let content_type = page.content_type.clone();
        let extraction = page.into_raw_content().and_then(|raw| {
            extract_products(&self.registry, &raw, &Retailer::parse(retailer), category)
        });

        match extraction {
            Ok(extraction) => to_json(&FetchReport {
                success: true,
                url: url.to_string(),
                retailer: retailer.to_string(),
                category: category.to_string(),
                strategy: extraction.strategy,
                product_count: extraction.products.len(),
                products: extraction.products,
                raw_length,
                content_type,
            }),
            Err(e) => {
                tracing::warn!(url, retailer, error = %e, "no products extracted");
                failure_json(&e.to_string())
            }
        }
    }

    /// Filters the products array from `fetch_page` down to deals.
    pub(crate) fn parse_deals(&self, params: &Params) -> String {
        let (content, retailer) = match (required(params, "content"), required(params, "retailer"))
        {
            (Ok(content), Ok(retailer)) => (content, retailer),
            (Err(e), _) | (_, Err(e)) => return failure_json(&e.to_string()),
        };
        let category = optional(params, "category");

        let threshold_pct = match params
            .get("min_discount_pct")
            .map(|raw| raw.trim())
            .filter(|raw| !raw.is_empty())
        {
            None => self.config.default_threshold_pct,
            Some(raw) => match raw.parse::<f64>() {
                Ok(pct) if pct.is_finite() => pct,
                _ => {
                    return failure_json(&format!("min_discount_pct must be a number, got {raw}"));
                }
            },
        };

        match products_from_json(content, category) {
            Ok(products) => {
                let deals = compute_deals(&products, retailer, category, threshold_pct);
                to_json(&DealReport::new(retailer, category, deals))
            }
            Err(e) => failure_json(&e.to_string()),
        }
    }

    /// Persists the deals array to Postgres.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is not configured or unreachable.
    pub(crate) async fn save_deals(&self, params: &Params) -> anyhow::Result<String> {
        let deals = match required(params, "deals").and_then(deals_from_json) {
            Ok(deals) => deals,
            Err(e) => return Ok(failure_json(&e.to_string())),
        };

        let pool = dealscope_db::connect_from_config(&self.config).await?;
        let writer = dealscope_db::PgDealWriter::new(pool);
        Ok(save_with_writer(&writer, &deals, &self.config).await)
    }
}

/// Runs the chunked write against any backend and renders the report.
pub(crate) async fn save_with_writer<W: DealWriter>(
    writer: &W,
    deals: &[Deal],
    config: &AppConfig,
) -> String {
    let (chunk_size, ttl_hours) = (config.write_chunk_size, config.deal_ttl_hours);
    match save_deals(writer, deals, chunk_size, ttl_hours).await {
        Ok(report) => to_json(&report),
        Err(e) => failure_json(&e.to_string()),
    }
}

fn required<'a>(params: &'a Params, field: &'static str) -> Result<&'a str, DealError> {
    params
        .get(field)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or(DealError::InputMissing { field })
}

fn optional<'a>(params: &'a Params, field: &str) -> &'a str {
    params.get(field).map_or("", String::as_str)
}

#[cfg(test)]
#[path = "tools_test.rs"]
pub(crate) mod tests;

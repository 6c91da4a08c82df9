use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("content from {context} is not valid JSON: {source}")]
    InvalidJson {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no extraction strategy registered for retailer \"{retailer}\"")]
    UnknownRetailer { retailer: String },

    #[error("no product data found for retailer \"{retailer}\" (tried: {tried})")]
    NoProductData { retailer: String, tried: String },
}

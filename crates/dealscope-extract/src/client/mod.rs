//! HTTP fetcher for retailer pages and feeds.

mod origin;

use std::time::Duration;

use dealscope_core::AppConfig;
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::backoff::retry_with_backoff;
use crate::dispatch::RawContent;
use crate::error::ExtractError;

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.7";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Seconds assumed when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// A successfully fetched response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// The URL as requested.
    pub url: String,
    pub body: String,
    /// `Content-Type` header value, if the server sent one.
    pub content_type: Option<String>,
}

impl FetchedPage {
    /// Length of the body in bytes.
    #[must_use]
    pub fn raw_length(&self) -> usize {
        self.body.len()
    }

    /// Classifies the body as HTML or JSON. See [`RawContent::classify`].
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidJson`] if the response declared JSON
    /// but the body does not parse.
    pub fn into_raw_content(self) -> Result<RawContent, ExtractError> {
        RawContent::classify(self.body, self.content_type.as_deref(), &self.url)
    }
}

/// Fetches pages with browser-like headers, a bounded redirect chain, and
/// retry on transient failures.
///
/// Rate limiting (429) and network errors are retried with exponential
/// backoff up to `max_retries` additional attempts. 404 and other non-2xx
/// responses fail immediately.
pub struct PageFetcher {
    client: Client,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff: `backoff_base_secs * 2^attempt`.
    backoff_base_secs: u64,
}

impl PageFetcher {
    /// Creates a `PageFetcher` with the given timeout, redirect limit,
    /// `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        max_redirects: usize,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .redirect(Policy::limited(max_redirects))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Builds a fetcher from the `DEALSCOPE_FETCH_*` settings.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ExtractError> {
        Self::new(
            config.fetch_timeout_secs,
            config.fetch_max_redirects,
            &config.fetch_user_agent,
            config.fetch_max_retries,
            config.fetch_retry_backoff_base_secs,
        )
    }

    /// GETs `url` and returns its body.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::InvalidUrl`] if `url` is not an absolute http(s) URL.
    /// - [`ExtractError::RateLimited`] if HTTP 429 persists after all retries.
    /// - [`ExtractError::NotFound`] on HTTP 404 (not retried).
    /// - [`ExtractError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ExtractError::Http`] on network or TLS failure after all retries.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, ExtractError> {
        let parsed = origin::parse_page_url(url)?;
        let referer = origin::page_origin(&parsed);

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.to_owned();
            let referer = referer.clone();
            async move {
                let response = self
                    .client
                    .get(&url)
                    .header(reqwest::header::ACCEPT, BROWSER_ACCEPT)
                    .header(reqwest::header::ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE)
                    .header(reqwest::header::REFERER, &referer)
                    .header(reqwest::header::CACHE_CONTROL, "no-cache")
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok())
                        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

                    return Err(ExtractError::RateLimited {
                        domain: origin::extract_domain(&url),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(ExtractError::NotFound { url });
                }

                if !status.is_success() {
                    return Err(ExtractError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                let body = response.text().await?;

                tracing::debug!(
                    url = %url,
                    bytes = body.len(),
                    content_type = content_type.as_deref().unwrap_or("-"),
                    "fetched page"
                );

                Ok(FetchedPage {
                    url,
                    body,
                    content_type,
                })
            }
        })
        .await
    }
}

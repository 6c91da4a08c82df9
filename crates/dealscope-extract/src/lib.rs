//! Product extraction from retailer pages and feeds.
//!
//! The extractors and the dispatcher are pure functions over already-fetched
//! content. [`PageFetcher`] is the only part that performs I/O.

pub(crate) mod backoff;
pub mod client;
pub mod direct_api;
pub mod dispatch;
pub mod embedded_state;
pub mod error;
pub mod jsonld;
pub mod path;
pub mod price;

pub use client::{FetchedPage, PageFetcher};
pub use direct_api::normalize_feed;
pub use dispatch::{extract_products, Extraction, RawContent};
pub use embedded_state::extract_embedded_state_products;
pub use error::ExtractError;
pub use jsonld::extract_structured_products;
pub use path::{parse_price, ValueExt};
pub use price::{reconcile_offers, PriceResolution};

//! Deal computation, tool-facing intake and reports, and the chunked
//! persistence driver.

pub mod engine;
pub mod intake;
pub mod persist;
pub mod report;

pub use engine::{compute_batch, compute_deals, discount_pct, DealRequest};
pub use intake::{deals_from_json, products_from_json};
pub use persist::{save_deals, DealItem, DealWriter};
pub use report::{failure_json, to_json, DealReport, FetchReport, SaveReport};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DealError {
    #[error("{field} parameter is required")]
    InputMissing { field: &'static str },

    #[error("{0}")]
    InvalidProducts(String),

    #[error("{0}")]
    InvalidDeals(String),

    #[error("deal TTL of {hours} hours is out of range")]
    InvalidTtl { hours: i64 },
}

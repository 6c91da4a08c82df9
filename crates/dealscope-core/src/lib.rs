pub mod app_config;
pub mod batch;
pub mod config;
pub mod products;
pub mod retailer;

pub use app_config::{AppConfig, Environment, MAX_DEAL_TTL_HOURS, MAX_WRITE_CHUNK_SIZE};
pub use batch::{load_batch_plan, BatchJob, BatchPlan, JobSource};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{CanonicalProduct, Deal, DEFAULT_CURRENCY, UNKNOWN_PRODUCT_NAME};
pub use retailer::{
    ApiNormalizer, ApiProfile, Retailer, RetailerProfile, RetailerRegistry, StateNormalizer,
    Strategy,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read batch plan {path}: {source}")]
    BatchFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse batch plan: {0}")]
    BatchFileParse(#[from] serde_yaml::Error),

    #[error("batch plan validation failed: {0}")]
    Validation(String),
}

//! Multi-retailer batch plans loaded from YAML.
//!
//! ```yaml
//! jobs:
//!   - retailer: nike
//!     category: running-shoes
//!     url: https://www.nike.com/w/sale-running-shoes
//!     threshold_pct: 40
//!   - retailer: rei
//!     category: jackets
//!     content_path: ./captures/rei-jackets.html
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchJob {
    pub retailer: String,
    #[serde(default)]
    pub category: String,
    /// Page or feed to fetch. Mutually exclusive with `content_path`.
    #[serde(default)]
    pub url: Option<String>,
    /// Previously captured page or feed on disk.
    #[serde(default)]
    pub content_path: Option<PathBuf>,
    /// Per-job threshold; falls back to the configured default when absent.
    #[serde(default)]
    pub threshold_pct: Option<f64>,
}

/// Where a job's raw content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource<'a> {
    Url(&'a str),
    File(&'a Path),
}

impl BatchJob {
    /// Returns the job's content source. Only valid after [`load_batch_plan`]
    /// validation, which guarantees exactly one is set.
    #[must_use]
    pub fn source(&self) -> Option<JobSource<'_>> {
        match (&self.url, &self.content_path) {
            (Some(url), None) => Some(JobSource::Url(url)),
            (None, Some(path)) => Some(JobSource::File(path)),
            _ => None,
        }
    }

    #[must_use]
    pub fn threshold_or(&self, default_pct: f64) -> f64 {
        self.threshold_pct.unwrap_or(default_pct)
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchPlan {
    pub jobs: Vec<BatchJob>,
}

/// Load and validate a batch plan from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_batch_plan(path: &Path) -> Result<BatchPlan, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::BatchFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_batch_plan(&content)
}

fn parse_batch_plan(content: &str) -> Result<BatchPlan, ConfigError> {
    let plan: BatchPlan = serde_yaml::from_str(content)?;
    validate_batch_plan(&plan)?;
    Ok(plan)
}

fn validate_batch_plan(plan: &BatchPlan) -> Result<(), ConfigError> {
    if plan.jobs.is_empty() {
        return Err(ConfigError::Validation(
            "batch plan must contain at least one job".to_string(),
        ));
    }

    for (idx, job) in plan.jobs.iter().enumerate() {
        if job.retailer.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "job {idx}: retailer must be non-empty"
            )));
        }

        if job.source().is_none() {
            return Err(ConfigError::Validation(format!(
                "job {idx} ({}): exactly one of url or content_path must be set",
                job.retailer
            )));
        }

        if let Some(pct) = job.threshold_pct {
            if !(0.0..=100.0).contains(&pct) {
                return Err(ConfigError::Validation(format!(
                    "job {idx} ({}): threshold_pct {pct} is outside 0..=100",
                    job.retailer
                )));
            }
        }
    }

    Ok(())
}

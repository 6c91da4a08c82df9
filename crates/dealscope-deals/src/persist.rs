//! Chunked deal persistence.
//!
//! [`save_deals`] owns chunking, expiry stamping, and error accounting. The
//! storage backend only has to implement [`DealWriter::write_chunk`].

use std::future::Future;

use chrono::{DateTime, TimeDelta, Utc};
use dealscope_core::{Deal, MAX_DEAL_TTL_HOURS, MAX_WRITE_CHUNK_SIZE};

use crate::report::SaveReport;
use crate::DealError;

/// A deal as stored: keyed by `(retailer#category, id)` and stamped with
/// its scrape time and expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct DealItem {
    pub pk: String,
    pub sk: String,
    pub deal: Deal,
    pub scraped_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DealItem {
    /// Keys `deal` and stamps it to expire `ttl_hours` after `scraped_at`.
    ///
    /// # Errors
    ///
    /// Returns [`DealError::InvalidTtl`] if `ttl_hours` is outside
    /// `1..=MAX_DEAL_TTL_HOURS` or the expiry is not a representable time.
    pub fn new(deal: Deal, scraped_at: DateTime<Utc>, ttl_hours: i64) -> Result<Self, DealError> {
        Ok(Self {
            pk: deal.partition_key(),
            sk: deal.id.clone(),
            expires_at: expiry(scraped_at, ttl_hours)?,
            scraped_at,
            deal,
        })
    }
}

fn expiry(scraped_at: DateTime<Utc>, ttl_hours: i64) -> Result<DateTime<Utc>, DealError> {
    if !(1..=MAX_DEAL_TTL_HOURS).contains(&ttl_hours) {
        return Err(DealError::InvalidTtl { hours: ttl_hours });
    }
    TimeDelta::try_hours(ttl_hours)
        .and_then(|ttl| scraped_at.checked_add_signed(ttl))
        .ok_or(DealError::InvalidTtl { hours: ttl_hours })
}

/// Storage backend for deal chunks.
pub trait DealWriter {
    type Error: std::fmt::Display;

    /// Writes up to [`MAX_WRITE_CHUNK_SIZE`] items and returns how many were
    /// left unprocessed. An `Err` means the whole chunk failed.
    fn write_chunk(
        &self,
        items: &[DealItem],
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;
}

/// Writes `deals` in chunks of at most `chunk_size` (capped at
/// [`MAX_WRITE_CHUNK_SIZE`]).
///
/// A failed chunk or a chunk with unprocessed items is recorded in the
/// report's `errors` and does not stop later chunks.
///
/// # Errors
///
/// Returns [`DealError::InputMissing`] if `deals` is empty, or
/// [`DealError::InvalidTtl`] if `ttl_hours` cannot produce an expiry. Nothing
/// is written in either case.
pub async fn save_deals<W: DealWriter>(
    writer: &W,
    deals: &[Deal],
    chunk_size: usize,
    ttl_hours: i64,
) -> Result<SaveReport, DealError> {
    if deals.is_empty() {
        return Err(DealError::InputMissing { field: "deals" });
    }

    let chunk_size = chunk_size.clamp(1, MAX_WRITE_CHUNK_SIZE);
    let scraped_at = Utc::now();
    expiry(scraped_at, ttl_hours)?;
    let mut saved = 0usize;
    let mut errors: Vec<String> = Vec::new();

    tracing::info!(
        total = deals.len(),
        chunk_size,
        ttl_hours,
        "starting deal write"
    );

    for (index, chunk) in deals.chunks(chunk_size).enumerate() {
        let chunk_no = index + 1;
        let items = chunk
            .iter()
            .cloned()
            .map(|deal| DealItem::new(deal, scraped_at, ttl_hours))
            .collect::<Result<Vec<_>, _>>()?;

        match writer.write_chunk(&items).await {
            Ok(unprocessed) => {
                let unprocessed = unprocessed.min(items.len());
                saved += items.len() - unprocessed;
                tracing::debug!(
                    chunk = chunk_no,
                    attempted = items.len(),
                    unprocessed,
                    "chunk written"
                );
                if unprocessed > 0 {
                    let msg = format!("{unprocessed} items unprocessed in chunk {chunk_no}");
                    tracing::warn!(chunk = chunk_no, unprocessed, "chunk partially written");
                    errors.push(msg);
                }
            }
            Err(e) => {
                tracing::warn!(chunk = chunk_no, error = %e, "chunk write failed");
                errors.push(format!("Batch write failed in chunk {chunk_no}: {e}"));
            }
        }
    }

    tracing::info!(
        saved,
        total = deals.len(),
        errors = errors.len(),
        "deal write finished"
    );

    Ok(SaveReport {
        success: errors.is_empty(),
        saved,
        total: deals.len(),
        errors,
    })
}

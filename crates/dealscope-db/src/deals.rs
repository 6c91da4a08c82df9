//! Database operations for the `deals` table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use dealscope_core::Deal;
use dealscope_deals::{DealItem, DealWriter};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `deals` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DealRow {
    pub pk: String,
    pub sk: String,
    pub name: String,
    pub retailer: String,
    pub category: String,
    pub original_price: Decimal,
    pub sale_price: Decimal,
    pub discount_pct: Decimal,
    pub image_url: String,
    pub product_url: String,
    pub scraped_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DealRow {
    #[must_use]
    pub fn to_deal(&self) -> Deal {
        Deal {
            id: self.sk.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            retailer: self.retailer.clone(),
            original_price: self.original_price.to_f64().unwrap_or_default(),
            sale_price: self.sale_price.to_f64().unwrap_or_default(),
            discount_pct: self.discount_pct.to_f64().unwrap_or_default(),
            image_url: self.image_url.clone(),
            product_url: self.product_url.clone(),
        }
    }
}

/// [`DealWriter`] backed by Postgres.
///
/// Each chunk is one `INSERT … SELECT * FROM UNNEST(…)` upsert. A deal whose
/// `(pk, sk)` is already stored is overwritten with the new prices and a
/// fresh expiry.
#[derive(Debug, Clone)]
pub struct PgDealWriter {
    pool: PgPool,
}

impl PgDealWriter {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DealWriter for PgDealWriter {
    type Error = DbError;

    async fn write_chunk(&self, items: &[DealItem]) -> Result<usize, DbError> {
        let stored = upsert_deal_items(&self.pool, items).await?;
        Ok(items.len().saturating_sub(stored))
    }
}

/// Insert or overwrite `items`. Returns how many of `items` are now stored.
///
/// When the same `(pk, sk)` appears more than once, only its last occurrence
/// is written; the earlier ones still count as stored.
///
/// # Errors
///
/// Returns [`DbError::InvalidNumeric`] if a price cannot be represented as a
/// decimal, or [`DbError::Sqlx`] if the query fails.
pub async fn upsert_deal_items(pool: &PgPool, items: &[DealItem]) -> Result<usize, DbError> {
    if items.is_empty() {
        return Ok(0);
    }

    // ON CONFLICT DO UPDATE cannot touch the same row twice in one statement.
    let unique = last_per_key(items);

    // Parallel column vectors for UNNEST binding.
    let mut pks: Vec<String> = Vec::with_capacity(unique.len());
    let mut sks: Vec<String> = Vec::with_capacity(unique.len());
    let mut names: Vec<String> = Vec::with_capacity(unique.len());
    let mut retailers: Vec<String> = Vec::with_capacity(unique.len());
    let mut categories: Vec<String> = Vec::with_capacity(unique.len());
    let mut original_prices: Vec<Decimal> = Vec::with_capacity(unique.len());
    let mut sale_prices: Vec<Decimal> = Vec::with_capacity(unique.len());
    let mut discount_pcts: Vec<Decimal> = Vec::with_capacity(unique.len());
    let mut image_urls: Vec<String> = Vec::with_capacity(unique.len());
    let mut product_urls: Vec<String> = Vec::with_capacity(unique.len());
    let mut scraped_ats: Vec<DateTime<Utc>> = Vec::with_capacity(unique.len());
    let mut expires_ats: Vec<DateTime<Utc>> = Vec::with_capacity(unique.len());

    for item in &unique {
        let deal = &item.deal;
        pks.push(item.pk.clone());
        sks.push(item.sk.clone());
        names.push(deal.name.clone());
        retailers.push(deal.retailer.clone());
        categories.push(deal.category.clone());
        original_prices.push(to_numeric("original_price", deal.original_price, 2)?);
        sale_prices.push(to_numeric("sale_price", deal.sale_price, 2)?);
        discount_pcts.push(to_numeric("discount_pct", deal.discount_pct, 1)?);
        image_urls.push(deal.image_url.clone());
        product_urls.push(deal.product_url.clone());
        scraped_ats.push(item.scraped_at);
        expires_ats.push(item.expires_at);
    }

    let rows: Vec<(String, String)> = sqlx::query_as::<_, (String, String)>(
        "INSERT INTO deals \
             (pk, sk, name, retailer, category, original_price, sale_price, discount_pct, \
              image_url, product_url, scraped_at, expires_at) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::text[], $3::text[], $4::text[], $5::text[], \
              $6::numeric[], $7::numeric[], $8::numeric[], \
              $9::text[], $10::text[], $11::timestamptz[], $12::timestamptz[]) \
         ON CONFLICT (pk, sk) DO UPDATE SET \
             name = EXCLUDED.name, \
             retailer = EXCLUDED.retailer, \
             category = EXCLUDED.category, \
             original_price = EXCLUDED.original_price, \
             sale_price = EXCLUDED.sale_price, \
             discount_pct = EXCLUDED.discount_pct, \
             image_url = EXCLUDED.image_url, \
             product_url = EXCLUDED.product_url, \
             scraped_at = EXCLUDED.scraped_at, \
             expires_at = EXCLUDED.expires_at \
         RETURNING pk, sk",
    )
    .bind(&pks)
    .bind(&sks)
    .bind(&names)
    .bind(&retailers)
    .bind(&categories)
    .bind(&original_prices)
    .bind(&sale_prices)
    .bind(&discount_pcts)
    .bind(&image_urls)
    .bind(&product_urls)
    .bind(&scraped_ats)
    .bind(&expires_ats)
    .fetch_all(pool)
    .await?;

    let written: HashSet<(&str, &str)> = rows
        .iter()
        .map(|(pk, sk)| (pk.as_str(), sk.as_str()))
        .collect();
    let stored = items
        .iter()
        .filter(|item| written.contains(&(item.pk.as_str(), item.sk.as_str())))
        .count();

    tracing::debug!(
        attempted = items.len(),
        distinct = unique.len(),
        stored,
        "deal chunk upserted"
    );

    Ok(stored)
}

/// Keeps the last occurrence of each `(pk, sk)`, in first-seen order of the
/// survivors.
fn last_per_key(items: &[DealItem]) -> Vec<&DealItem> {
    let mut seen: HashSet<(&str, &str)> = HashSet::with_capacity(items.len());
    let mut unique: Vec<&DealItem> = items
        .iter()
        .rev()
        .filter(|item| seen.insert((item.pk.as_str(), item.sk.as_str())))
        .collect();
    unique.reverse();
    unique
}

/// Deals that have not yet expired, best discount first. Filters by retailer
/// when one is given.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_active_deals(
    pool: &PgPool,
    retailer: Option<&str>,
    limit: i64,
) -> Result<Vec<DealRow>, sqlx::Error> {
    sqlx::query_as::<_, DealRow>(
        "SELECT pk, sk, name, retailer, category, original_price, sale_price, discount_pct, \
                image_url, product_url, scraped_at, expires_at \
         FROM deals \
         WHERE expires_at > NOW() \
           AND ($1::text IS NULL OR retailer = $1) \
         ORDER BY discount_pct DESC, scraped_at DESC \
         LIMIT $2",
    )
    .bind(retailer)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Delete deals whose expiry has passed. Returns the number removed.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn purge_expired_deals(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM deals WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

fn to_numeric(field: &'static str, value: f64, scale: u32) -> Result<Decimal, DbError> {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(scale))
        .ok_or(DbError::InvalidNumeric { field, value })
}

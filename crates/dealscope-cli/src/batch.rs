//! `run`: multi-retailer batch over a YAML plan.
//!
//! Jobs are fetched and extracted concurrently (bounded by
//! `max_concurrent_jobs`), then every extracted job's deals are computed
//! together with its own threshold. One job's failure is logged and reported
//! without affecting the rest.

use std::path::Path;

use anyhow::Context;
use futures::stream::{self, StreamExt};
use serde::Serialize;

use dealscope_core::{load_batch_plan, BatchJob, Deal, JobSource, Retailer};
use dealscope_deals::{compute_batch, DealRequest};
use dealscope_extract::{extract_products, Extraction, RawContent};

use crate::tools::{save_with_writer, ToolContext};

/// Per-job line of the batch summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobSummary {
    pub(crate) retailer: String,
    pub(crate) category: String,
    pub(crate) success: bool,
    pub(crate) strategy: Option<String>,
    pub(crate) products: usize,
    pub(crate) deals_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchSummary {
    pub(crate) jobs: Vec<JobSummary>,
    pub(crate) total_deals: usize,
    pub(crate) deals: Vec<Deal>,
}

/// Loads `plan_path`, runs every job, prints the summary as JSON, and
/// optionally persists all deals found.
///
/// # Errors
///
/// Returns an error if the plan cannot be loaded or, with `save`, if the
/// database cannot be reached. Per-job failures are reported in the summary.
pub(crate) async fn run_batch(
    ctx: &ToolContext,
    plan_path: &Path,
    save: bool,
) -> anyhow::Result<()> {
    let plan = load_batch_plan(plan_path)?;
    let summary = execute_jobs(ctx, &plan.jobs).await;

    let failed = summary.jobs.iter().filter(|j| !j.success).count();
    tracing::info!(
        jobs = summary.jobs.len(),
        failed,
        total_deals = summary.total_deals,
        "batch finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if save {
        if summary.deals.is_empty() {
            println!("no deals to save");
        } else {
            let pool = dealscope_db::connect_from_config(&ctx.config).await?;
            let writer = dealscope_db::PgDealWriter::new(pool);
            let report = save_with_writer(&writer, &summary.deals, &ctx.config).await;
            println!("{report}");
        }
    }

    Ok(())
}

/// Fetches and extracts every job with bounded concurrency, then computes
/// deals for all extracted jobs in one pass. Summaries come back in plan
/// order.
pub(crate) async fn execute_jobs(ctx: &ToolContext, jobs: &[BatchJob]) -> BatchSummary {
    let max_concurrent = ctx.config.max_concurrent_jobs.max(1);

    let mut extracted: Vec<(usize, Result<Extraction, String>)> =
        stream::iter(jobs.iter().enumerate())
            .map(|(idx, job)| async move { (idx, extract_job(ctx, job).await) })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;
    extracted.sort_by_key(|(idx, _)| *idx);

    let mut summaries = Vec::with_capacity(jobs.len());
    let mut requests = Vec::new();
    // Summary index of each request, in request order.
    let mut request_jobs = Vec::new();

    for (job, (_, outcome)) in jobs.iter().zip(extracted) {
        let mut summary = JobSummary {
            retailer: job.retailer.clone(),
            category: job.category.clone(),
            success: false,
            strategy: None,
            products: 0,
            deals_found: 0,
            error: None,
        };
        match outcome {
            Ok(extraction) => {
                summary.success = true;
                summary.strategy = Some(extraction.strategy.as_str().to_string());
                summary.products = extraction.products.len();
                request_jobs.push(summaries.len());
                requests.push(DealRequest {
                    retailer: job.retailer.clone(),
                    category: job.category.clone(),
                    threshold_pct: job.threshold_or(ctx.config.default_threshold_pct),
                    products: extraction.products,
                });
            }
            Err(error) => summary.error = Some(error),
        }
        summaries.push(summary);
    }

    let mut deals = Vec::new();
    for (job_idx, job_deals) in request_jobs.into_iter().zip(compute_batch(&requests)) {
        summaries[job_idx].deals_found = job_deals.len();
        deals.extend(job_deals);
    }

    BatchSummary {
        jobs: summaries,
        total_deals: deals.len(),
        deals,
    }
}

/// Loads one job's content and extracts its products. Failures are logged
/// and returned as the message that goes into the job's summary.
async fn extract_job(ctx: &ToolContext, job: &BatchJob) -> Result<Extraction, String> {
    let raw = match load_content(ctx, job).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(
                retailer = %job.retailer,
                error = %e,
                "job content unavailable; skipping"
            );
            return Err(format!("{e:#}"));
        }
    };

    let retailer = Retailer::parse(&job.retailer);
    match extract_products(&ctx.registry, &raw, &retailer, &job.category) {
        Ok(extraction) => Ok(extraction),
        Err(e) => {
            tracing::warn!(retailer = %job.retailer, error = %e, "job extraction failed");
            Err(e.to_string())
        }
    }
}

async fn load_content(ctx: &ToolContext, job: &BatchJob) -> anyhow::Result<RawContent> {
    match job.source() {
        Some(JobSource::Url(url)) => {
            let page = ctx.fetcher.fetch(url).await?;
            Ok(page.into_raw_content()?)
        }
        Some(JobSource::File(path)) => {
            let body = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read captured content {}", path.display()))?;
            Ok(RawContent::sniff(body))
        }
        None => anyhow::bail!("job has neither url nor content_path"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::tools::tests::test_config;

    const PARKA_PAGE: &str = r#"<html><script type="application/ld+json">
        {"@type": "Product", "name": "Parka", "sku": "p-1",
         "offers": [{"@type": "Offer", "priceType": "https://schema.org/SalePrice", "price": "40"},
                    {"@type": "Offer", "priceType": "https://schema.org/ListPrice", "price": "100"}]}
        </script></html>"#;

    const JACKET_PAGE: &str = r#"<html><script type="application/ld+json">
        {"@type": "Product", "name": "Shell", "sku": "s-1",
         "offers": [{"@type": "Offer", "priceType": "https://schema.org/SalePrice", "price": "60"},
                    {"@type": "Offer", "priceType": "https://schema.org/ListPrice", "price": "100"}]}
        </script></html>"#;

    fn job(retailer: &str, url: Option<String>, threshold_pct: Option<f64>) -> BatchJob {
        BatchJob {
            retailer: retailer.to_string(),
            category: "jackets".to_string(),
            url,
            content_path: None,
            threshold_pct,
        }
    }

    async fn serve(server: &MockServer, route: &str, html: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(html),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn jobs_apply_their_own_thresholds() {
        let server = MockServer::start().await;
        serve(&server, "/rei", PARKA_PAGE).await;
        serve(&server, "/patagonia", JACKET_PAGE).await;

        let base = server.uri();

        let ctx = ToolContext::from_config(test_config()).unwrap();
        let jobs = vec![
            job("rei", Some(format!("{base}/rei")), Some(30.0)),
            job("patagonia", Some(format!("{base}/patagonia")), Some(50.0)),
        ];
        let summary = execute_jobs(&ctx, &jobs).await;

        assert_eq!(summary.jobs.len(), 2);
        assert_eq!(summary.jobs[0].retailer, "rei");
        assert_eq!(summary.jobs[0].deals_found, 1);
        assert_eq!(summary.jobs[1].retailer, "patagonia");
        assert!(summary.jobs[1].success);
        assert_eq!(summary.jobs[1].products, 1);
        assert_eq!(summary.jobs[1].deals_found, 0);
        assert_eq!(summary.total_deals, 1);
        assert_eq!(summary.deals[0].retailer, "rei");
        assert!((summary.deals[0].discount_pct - 60.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn deals_follow_plan_order() {
        let server = MockServer::start().await;
        serve(&server, "/patagonia", JACKET_PAGE).await;
        serve(&server, "/rei", PARKA_PAGE).await;
        let base = server.uri();

        let ctx = ToolContext::from_config(test_config()).unwrap();
        let jobs = vec![
            job("patagonia", Some(format!("{base}/patagonia")), Some(30.0)),
            job("rei", Some(format!("{base}/rei")), Some(30.0)),
            job("rei", Some(format!("{base}/patagonia")), Some(30.0)),
        ];
        let summary = execute_jobs(&ctx, &jobs).await;

        let found: Vec<usize> = summary.jobs.iter().map(|j| j.deals_found).collect();
        assert_eq!(found, vec![1, 1, 1]);
        let names: Vec<(&str, &str)> = summary
            .deals
            .iter()
            .map(|d| (d.retailer.as_str(), d.name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![("patagonia", "Shell"), ("rei", "Parka"), ("rei", "Shell")]
        );
    }

    #[tokio::test]
    async fn failed_job_does_not_stop_others() {
        let server = MockServer::start().await;
        serve(&server, "/rei", PARKA_PAGE).await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let base = server.uri();

        let ctx = ToolContext::from_config(test_config()).unwrap();
        let jobs = vec![
            job("patagonia", Some(format!("{base}/broken")), None),
            job("rei", Some(format!("{base}/rei")), None),
            job("acme", Some(format!("{base}/rei")), None),
        ];
        let summary = execute_jobs(&ctx, &jobs).await;

        assert!(!summary.jobs[0].success);
        assert!(summary.jobs[0].error.as_deref().unwrap().contains("500"));
        assert!(summary.jobs[1].success);
        assert!(!summary.jobs[2].success);
        assert!(summary.jobs[2].error.as_deref().unwrap().contains("acme"));
        assert_eq!(summary.total_deals, 1);
    }

    #[tokio::test]
    async fn missing_capture_file_is_reported() {
        let ctx = ToolContext::from_config(test_config()).unwrap();
        let jobs = vec![BatchJob {
            content_path: Some(PathBuf::from("/nonexistent/dealscope/capture.html")),
            ..job("rei", None, None)
        }];
        let summary = execute_jobs(&ctx, &jobs).await;

        assert!(!summary.jobs[0].success);
        assert!(summary.jobs[0]
            .error
            .as_deref()
            .unwrap()
            .starts_with("failed to read captured content"));
    }
}

// src/pipeline/crawl.rs

//! Concurrent stage execution and whole-site crawls.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::models::{CatalogItem, DetailRecord, HomePage};
use crate::services::{CatalogPipeline, StageOutput, StageReport, StageRequest};
use crate::utils::log;
use crate::utils::url::get_domain;

/// Run independent stage invocations on a bounded worker pool.
///
/// Reports come back in request order; a failed request yields an empty
/// result and never cancels the others.
pub async fn run_requests(
    pipeline: &CatalogPipeline,
    requests: Vec<StageRequest>,
    workers: usize,
) -> Vec<StageReport> {
    let mut reports: Vec<(usize, StageReport)> = stream::iter(requests.into_iter().enumerate())
        .map(|(index, request)| async move { (index, pipeline.run(&request).await) })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    reports.sort_by_key(|(index, _)| *index);
    reports.into_iter().map(|(_, report)| report).collect()
}

/// Options for [`crawl_site`].
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Concurrent stage invocations
    pub workers: usize,
    /// Detail pages to fetch, taken from the first listed items
    pub details: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            details: 0,
        }
    }
}

/// First page of one category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListing {
    pub category_id: String,
    pub items: Vec<CatalogItem>,
}

/// Summary of a site crawl.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOutcome {
    pub site: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub home: HomePage,
    pub listings: Vec<CategoryListing>,
    pub details: Vec<DetailRecord>,
    pub home_failed: bool,
    pub category_total: usize,
    pub category_failures: usize,
    pub detail_total: usize,
    pub detail_failures: usize,
    /// Diagnostics of every failed invocation
    pub errors: Vec<String>,
}

impl CrawlOutcome {
    pub fn failures(&self) -> usize {
        usize::from(self.home_failed) + self.category_failures + self.detail_failures
    }
}

/// Crawl one site: home, page 1 of every category, then optional details.
///
/// Failures are counted per stage and never abort the crawl.
pub async fn crawl_site(pipeline: &CatalogPipeline, options: &CrawlOptions) -> CrawlOutcome {
    let started_at = Utc::now();
    let site = pipeline.site_id().to_string();
    let total_steps = if options.details > 0 { 3 } else { 2 };
    let mut errors = Vec::new();

    match get_domain(&pipeline.adapter().home_url) {
        Some(domain) => log::header(&format!("Crawling {site} ({domain})")),
        None => log::header(&format!("Crawling {site}")),
    }

    // Stage 1: home page
    log::step(1, total_steps, "Fetching home page");
    let report = pipeline.run(&StageRequest::Home).await;
    let home_failed = !report.is_ok();
    errors.extend(report.error);
    let home = match report.output {
        StageOutput::Home(home) => home,
        _ => HomePage::default(),
    };
    log::sub_item(&format!(
        "{} categories, {} items",
        home.categories.len(),
        home.items.len()
    ));

    // Stage 2: first page of every category
    log::step(2, total_steps, "Fetching category listings");
    let requests: Vec<_> = home
        .categories
        .iter()
        .map(|category| StageRequest::category(category.id.clone()))
        .collect();
    let category_total = requests.len();
    let mut category_failures = 0;
    let mut listings = Vec::new();
    let reports = run_requests(pipeline, requests, options.workers).await;
    for (category, report) in home.categories.iter().zip(reports) {
        if let Some(error) = report.error {
            category_failures += 1;
            errors.push(error);
            continue;
        }
        if let StageOutput::Items(items) = report.output {
            listings.push(CategoryListing {
                category_id: category.id.clone(),
                items,
            });
        }
    }

    // Stage 3: details for the first listed items
    let mut details = Vec::new();
    let mut detail_total = 0;
    let mut detail_failures = 0;
    if options.details > 0 {
        log::step(3, total_steps, "Fetching details");
        let mut seen = HashSet::new();
        let requests: Vec<_> = home
            .items
            .iter()
            .chain(listings.iter().flat_map(|listing| listing.items.iter()))
            .filter(|item| seen.insert(item.id.clone()))
            .take(options.details)
            .map(|item| StageRequest::Detail {
                vid: item.id.clone(),
            })
            .collect();
        detail_total = requests.len();

        for report in run_requests(pipeline, requests, options.workers).await {
            match (report.error, report.output) {
                (Some(error), _) => {
                    detail_failures += 1;
                    errors.push(error);
                }
                (None, StageOutput::Detail(Some(detail))) => details.push(detail),
                _ => {}
            }
        }
    }

    let outcome = CrawlOutcome {
        site,
        started_at,
        finished_at: Utc::now(),
        home,
        listings,
        details,
        home_failed,
        category_total,
        category_failures,
        detail_total,
        detail_failures,
        errors,
    };

    let elapsed = outcome.finished_at - outcome.started_at;
    log::summary(
        &format!("Crawl of {}", outcome.site),
        &[
            ("Home", if home_failed { "failed" } else { "ok" }.to_string()),
            (
                "Categories",
                format!("{}/{} ok", category_total - category_failures, category_total),
            ),
            (
                "Details",
                format!("{}/{} ok", detail_total - detail_failures, detail_total),
            ),
            ("Elapsed", format!("{} ms", elapsed.num_milliseconds())),
        ],
    );
    for error in &outcome.errors {
        log::warn(error);
    }

    outcome
}

//! Output module for generating crawl reports
//!
//! This module handles:
//! - Collecting crawl statistics from storage
//! - Generating markdown reports of explored states

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::model::PageId;
use crate::storage::{PageSummary, Persistence, RunRecord, UrlRecord};
use crate::Result;
use std::collections::BTreeMap;

/// Everything the markdown report shows
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub run: Option<RunRecord>,
    pub duration_seconds: Option<u64>,
    pub statistics: CrawlStatistics,
    /// Delta depth -> number of delta pages
    pub delta_depth_breakdown: BTreeMap<u32, u64>,
    pub pages: Vec<PageSummary>,
    /// Visited URLs whose status was not 200
    pub failed_urls: Vec<UrlRecord>,
    /// Page ids per similarity cluster; empty when the report is built
    /// outside a crawl
    pub clusters: Vec<Vec<PageId>>,
}

/// Builds a report from storage
///
/// # Arguments
///
/// * `storage` - The storage backend containing crawl data
/// * `clusters` - Page clusters formed during the crawl, if any
pub fn generate_report(storage: &dyn Persistence, clusters: Vec<Vec<PageId>>) -> Result<CrawlReport> {
    let run = storage.get_latest_run()?;

    let duration_seconds = run.as_ref().and_then(|run| {
        let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
        let finished = run
            .finished_at
            .as_ref()?
            .parse::<chrono::DateTime<chrono::Utc>>()
            .ok()?;
        u64::try_from((finished - started).num_seconds()).ok()
    });

    let pages = storage.list_pages()?;
    let mut delta_depth_breakdown = BTreeMap::new();
    for page in pages.iter().filter(|p| p.is_delta) {
        *delta_depth_breakdown.entry(page.delta_depth).or_insert(0) += 1;
    }

    let failed_urls = storage
        .list_urls()?
        .into_iter()
        .filter(|u| matches!(u.response_code, Some(code) if code != 200))
        .collect();

    Ok(CrawlReport {
        run,
        duration_seconds,
        statistics: load_statistics(storage)?,
        delta_depth_breakdown,
        pages,
        failed_urls,
        clusters,
    })
}

//! Storage traits and error types
//!
//! This module defines the persistence interface the exploration engine
//! depends on, and the associated error types.

use crate::model::{AjaxRequest, Clickable, ClickableType, CrawlUrl, DeltaPage, Page, PageId, WebPage};
use crate::storage::{PageCounts, PageSummary, RunRecord, UrlCounts, UrlRecord};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Page not found: {0}")]
    PageNotFound(PageId),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence backend used by the crawler
///
/// The engine assumes a single writer: one crawl session per store.
pub trait Persistence: Send {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its id
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    /// Marks a run as failed with a finish timestamp
    fn fail_run(&mut self, run_id: i64) -> StorageResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== URLs =====

    /// Records a discovered URL; known URLs are left untouched
    fn insert_url(&mut self, url: &CrawlUrl) -> StorageResult<()>;

    /// Records the outcome of a normal-page visit
    ///
    /// # Arguments
    ///
    /// * `url` - The frontier URL that was visited
    /// * `page_id` - The stored page, `None` when the visit was skipped or failed
    /// * `status` - HTTP status, 0 when skipped or unreachable
    /// * `landing_url` - Where the visit ended up after redirects
    fn visit_url(
        &mut self,
        url: &str,
        page_id: Option<PageId>,
        status: u16,
        landing_url: Option<&str>,
    ) -> StorageResult<()>;

    // ===== Pages =====

    fn store_web_page(&mut self, page: &WebPage) -> StorageResult<()>;

    fn store_delta_page(&mut self, page: &DeltaPage) -> StorageResult<()>;

    /// Inserts or updates the state of one clickable belonging to `page_id`
    fn update_clickable(&mut self, page_id: PageId, clickable: &Clickable) -> StorageResult<()>;

    /// Loads a page with its current clickable states
    fn get_page_by_id(&self, id: PageId) -> StorageResult<Option<Page>>;

    /// All stored delta pages observed at `url`
    fn get_crawled_delta_pages(&self, url: &str) -> StorageResult<Vec<DeltaPage>>;

    /// Appends backend calls to a stored page's ajax log
    fn extend_ajax_requests(&mut self, page_id: PageId, requests: &[AjaxRequest])
        -> StorageResult<()>;

    /// Highest page id in the store
    fn max_page_id(&self) -> StorageResult<Option<PageId>>;

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<PageCounts>;

    fn count_clickables_by_type(&self) -> StorageResult<HashMap<ClickableType, u64>>;

    fn count_urls(&self) -> StorageResult<UrlCounts>;

    /// Summaries of every stored page ordered by id
    fn list_pages(&self) -> StorageResult<Vec<PageSummary>>;

    /// Every known URL ordered by discovery
    fn list_urls(&self) -> StorageResult<Vec<UrlRecord>>;

    /// Clickables of a page in document order
    fn get_clickables(&self, page_id: PageId) -> StorageResult<Vec<Clickable>>;
}

//! Collaborator contracts consumed by the exploration engine
//!
//! The engine never touches a browser, the network or the database directly.
//! Everything it needs from the outside world goes through the traits below,
//! so the whole exploration algorithm can be driven by scripted collaborators
//! in tests.

use crate::model::{AjaxRequest, Clickable, CrawlUrl, Form, Link, Page, PageContent, PageId, WebPage};
use crate::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// How backend requests are treated while a clickable executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XhrMode {
    /// Capture every backend call without letting it reach the server
    Intercept,
    /// Let backend calls through and record them
    Observe,
}

/// Everything the analyzer learned from loading a URL
#[derive(Debug, Clone, Default)]
pub struct AnalyzedPage {
    pub status_code: u16,
    /// URL after redirects
    pub landing_url: String,
    pub html: String,
    pub content: PageContent,
    /// Requests fired by timers once the page was loaded
    pub timing_requests: Vec<AjaxRequest>,
}

/// Raw state observed after executing a clickable, before differencing
#[derive(Debug, Clone, Default)]
pub struct DeltaObservation {
    pub url: String,
    pub html: String,
    pub content: PageContent,
}

/// Outcome of executing one clickable
#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// The element's tag cannot receive the event
    UnsupportedTag,
    /// The target element is missing from the replayed state
    TargetElementNotFound,
    /// The page could not be loaded before replaying
    ErrorWhileInitialLoading,
    /// One of the necessary prior clicks could not be replayed
    PreviousClickNotFound,
    /// The event navigated the browser to another URL
    UrlChanged(String),
    /// The event changed the DOM
    Delta(DeltaObservation),
}

/// Loads and analyzes a URL
#[async_trait]
pub trait Analyzer: Send {
    async fn analyze(&mut self, url: &str, depth: u32, timeout: Duration) -> Result<AnalyzedPage>;
}

/// Executes DOM events inside a controlled browser
#[async_trait]
pub trait EventExecutor: Send {
    /// Event names (without the `on` prefix) this executor can trigger
    fn supported_events(&self) -> &[&'static str];

    /// Reaches `page` by replaying `necessary_clicks` in order, then executes
    /// `clickable` on it
    ///
    /// An `Err` means the browser session itself is broken; per-clickable
    /// problems are reported through the outcome.
    async fn execute(
        &mut self,
        page: &Page,
        clickable: &Clickable,
        necessary_clicks: &[Clickable],
        mode: XhrMode,
    ) -> Result<EventOutcome>;
}

/// Fills in and submits forms
#[async_trait]
pub trait FormHandler: Send {
    /// Submits `form` on the page at `page_url` using `credentials`
    /// (field name -> value) and analyzes the resulting page
    async fn submit(
        &mut self,
        form: &Form,
        page_url: &str,
        credentials: &BTreeMap<String, String>,
    ) -> Result<AnalyzedPage>;
}

/// The URL frontier and crawl scope
pub trait Frontier: Send {
    /// Normalizes a raw address into a frontier URL, `None` if it cannot be crawled
    fn create_url(&self, raw: &str, depth_of_finding: Option<u32>) -> Option<CrawlUrl>;

    fn is_in_scope(&self, url: &str) -> bool;

    /// Adds a single address; returns the URL if it was not seen before
    fn add_url(&mut self, raw: &str, depth_of_finding: Option<u32>) -> Option<CrawlUrl>;

    fn next_url_for_crawling(&mut self) -> Option<CrawlUrl>;

    /// Resolves relative link and form action URLs against `base_url` in place
    fn complete_urls(&self, content: &mut PageContent, base_url: &str);

    /// Adds every unseen in-scope link and returns the new frontier entries
    fn extract_new_links(&mut self, links: &[Link], depth: u32) -> Vec<CrawlUrl>;

    /// Number of URLs waiting to be crawled
    fn pending(&self) -> usize;
}

/// Groups normal pages for reporting
pub trait Clustering: Send {
    fn add_webpage(&mut self, page: &WebPage);

    /// Page ids per cluster, in the order clusters were opened
    fn clusters(&self) -> Vec<Vec<PageId>> {
        Vec::new()
    }
}

/// Crawl policy hooks applied to a page's clickable work queue
pub trait ClickableFilter: Send {
    /// Rejected clickables are tagged `IgnoredByCrawler` and never executed
    fn should_execute(&self, _clickable: &Clickable) -> bool {
        true
    }

    /// Reorders or thins the work queue right before execution starts
    fn order_for_execution(&self, queue: VecDeque<Clickable>) -> VecDeque<Clickable> {
        queue
    }
}

/// Default policy: execute everything in document order
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl ClickableFilter for AcceptAll {}

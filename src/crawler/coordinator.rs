//! Crawl orchestration
//!
//! The crawler alternates between two kinds of rounds. A delta round pops the
//! oldest pending delta page, rebuilds the chain of clicks that leads to it
//! and explores its clickables. A normal round takes the next URL from the
//! frontier, loads and stores it, and explores its clickables. The crawl ends
//! when both the pending delta queue and the frontier are empty.

use crate::config::Config;
use crate::crawler::ids::PageIdAllocator;
use crate::crawler::session::SessionGuard;
use crate::crawler::traits::{
    AcceptAll, Analyzer, ClickableFilter, Clustering, EventExecutor, FormHandler, Frontier,
};
use crate::model::{Clickable, CrawlUrl, DeltaPage, Page, PageId, WebPage};
use crate::storage::Persistence;
use crate::{Result, RippleError};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Which kind of state a round explores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    NormalPage,
    DeltaPage,
}

/// The outside world as seen by the crawler
pub struct Collaborators {
    pub analyzer: Box<dyn Analyzer>,
    pub executor: Box<dyn EventExecutor>,
    pub form_handler: Box<dyn FormHandler>,
    pub frontier: Box<dyn Frontier>,
    pub storage: Box<dyn Persistence>,
    pub clustering: Box<dyn Clustering>,
}

/// Totals of one crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub web_pages: u64,
    pub delta_pages: u64,
    /// URLs skipped for scope or depth, or because they failed to load
    pub skipped_urls: u64,
}

/// The state exploration engine
pub struct Crawler {
    pub(super) config: Config,
    pub(super) analyzer: Box<dyn Analyzer>,
    pub(super) executor: Box<dyn EventExecutor>,
    pub(super) form_handler: Box<dyn FormHandler>,
    pub(super) frontier: Box<dyn Frontier>,
    pub(super) storage: Box<dyn Persistence>,
    pub(super) clustering: Box<dyn Clustering>,
    pub(super) filter: Box<dyn ClickableFilter>,
    pub(super) session: SessionGuard,
    pub(super) ids: PageIdAllocator,
    pub(super) pending: VecDeque<DeltaPage>,
    config_hash: String,
}

/// A round's page together with what is needed to reach it in the browser
struct Round {
    page: Page,
    state: CrawlState,
    necessary_clicks: Vec<Clickable>,
    /// Ancestors of a delta page, parent first
    previous_pages: Vec<Page>,
}

impl Crawler {
    /// Creates a crawler over `collaborators`
    ///
    /// Page ids continue after the highest id already persisted, so a crawl
    /// can run against a database that holds earlier runs.
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self> {
        let first_id = collaborators.storage.max_page_id()?.unwrap_or(0) + 1;
        let session = SessionGuard::new(
            config.login.clone(),
            &config.similarity,
            config.crawler.crawl_speed,
        );

        Ok(Self {
            analyzer: collaborators.analyzer,
            executor: collaborators.executor,
            form_handler: collaborators.form_handler,
            frontier: collaborators.frontier,
            storage: collaborators.storage,
            clustering: collaborators.clustering,
            filter: Box::new(AcceptAll),
            session,
            ids: PageIdAllocator::starting_at(first_id),
            pending: VecDeque::new(),
            config_hash: String::new(),
            config,
        })
    }

    /// Replaces the default accept-all clickable policy
    pub fn with_filter(mut self, filter: Box<dyn ClickableFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Records `hash` on the crawl run
    pub fn with_config_hash(mut self, hash: &str) -> Self {
        self.config_hash = hash.to_string();
        self
    }

    pub fn storage(&self) -> &dyn Persistence {
        self.storage.as_ref()
    }

    pub fn clustering(&self) -> &dyn Clustering {
        self.clustering.as_ref()
    }

    /// Delta pages waiting to be explored
    pub fn pending_deltas(&self) -> &VecDeque<DeltaPage> {
        &self.pending
    }

    /// Explores the application until the frontier and the pending delta
    /// queue are both exhausted
    ///
    /// # Errors
    ///
    /// A failed initial login, a broken delta chain, a dead browser session
    /// and storage failures abort the run; the run is then marked failed.
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        let run_id = self.storage.create_run(&self.config_hash)?;
        info!("Starting crawl run {} at {}", run_id, self.config.crawler.start_url);

        let result = self.crawl().await;
        match result {
            Ok(summary) => {
                self.storage.complete_run(run_id)?;
                Ok(summary)
            }
            Err(e) => {
                error!("Crawl run {} failed: {}", run_id, e);
                if let Err(storage_error) = self.storage.fail_run(run_id) {
                    warn!("Could not mark run {} as failed: {}", run_id, storage_error);
                }
                Err(e)
            }
        }
    }

    async fn crawl(&mut self) -> Result<CrawlSummary> {
        if let Some(start) = self.frontier.create_url(&self.config.crawler.start_url, None) {
            self.storage.insert_url(&start)?;
        }

        if self.session.is_configured() {
            self.session
                .initial_login(self.analyzer.as_mut(), self.form_handler.as_mut())
                .await?;
        }

        let started = Instant::now();
        let mut summary = CrawlSummary::default();

        loop {
            let round = if let Some(delta) = self.pending.pop_front() {
                self.delta_round(delta)?
            } else if let Some(url) = self.frontier.next_url_for_crawling() {
                match self.normal_round(url).await? {
                    Some(round) => round,
                    None => {
                        summary.skipped_urls += 1;
                        continue;
                    }
                }
            } else {
                break;
            };

            match round.state {
                CrawlState::NormalPage => summary.web_pages += 1,
                CrawlState::DeltaPage => summary.delta_pages += 1,
            }
            self.explore(round).await?;

            info!(
                "Progress: {} pages, {} delta pages explored, {} deltas pending, {} URLs in frontier ({:.1}s)",
                summary.web_pages,
                summary.delta_pages,
                self.pending.len(),
                self.frontier.pending(),
                started.elapsed().as_secs_f64()
            );
        }

        info!(
            "Crawl completed: {} pages and {} delta pages explored in {:?}",
            summary.web_pages,
            summary.delta_pages,
            started.elapsed()
        );
        Ok(summary)
    }

    /// Prepares a pending delta page for exploration
    fn delta_round(&mut self, mut delta: DeltaPage) -> Result<Round> {
        debug!(
            "Exploring delta page {} (delta depth {}) of page {}",
            delta.id, delta.delta_depth, delta.parent_id
        );
        let (necessary_clicks, previous_pages) = self.walk_ancestors(&delta)?;

        if let Some(parent) = previous_pages.first() {
            delta.html = parent.html().to_string();
        }
        if let Some(root) = previous_pages.last() {
            delta.current_depth = root.current_depth();
        }
        self.storage.store_delta_page(&delta)?;

        Ok(Round {
            page: Page::Delta(delta),
            state: CrawlState::DeltaPage,
            necessary_clicks,
            previous_pages,
        })
    }

    /// Collects the generators that lead from the root web page to `delta`,
    /// oldest first, and the ancestor pages, parent first
    fn walk_ancestors(&self, delta: &DeltaPage) -> Result<(Vec<Clickable>, Vec<Page>)> {
        let limit = self.config.crawler.max_depth + self.config.crawler.max_delta_depth;
        let mut clicks = vec![delta.generator.clone()];
        let mut ancestors = Vec::new();
        let mut parent_id = delta.parent_id;

        loop {
            if ancestors.len() >= limit as usize {
                return Err(RippleError::AncestorChainTooLong {
                    page_id: delta.id,
                    limit,
                });
            }

            let parent = self
                .storage
                .get_page_by_id(parent_id)?
                .ok_or(RippleError::AncestorNotFound { page_id: parent_id })?;

            match &parent {
                Page::Delta(d) => {
                    clicks.push(d.generator.clone());
                    parent_id = d.parent_id;
                    ancestors.push(parent);
                }
                Page::Web(_) => {
                    ancestors.push(parent);
                    break;
                }
            }
        }

        clicks.reverse();
        Ok((clicks, ancestors))
    }

    /// Loads and stores the page behind a frontier URL
    ///
    /// Returns `None` when the URL is skipped; it is then recorded as visited
    /// with status 0.
    async fn normal_round(&mut self, url: CrawlUrl) -> Result<Option<Round>> {
        // The start URL has no finding depth and sits at depth 0
        let found_at = url.depth_of_finding.unwrap_or(0);
        let depth = url.depth_of_finding.map_or(0, |found_at| found_at + 1);

        if !self.frontier.is_in_scope(&url.url) || found_at > self.config.crawler.max_depth {
            debug!("Skipping {} (found at depth {})", url.url, found_at);
            self.storage.visit_url(&url.url, None, 0, None)?;
            return Ok(None);
        }

        let timeout = self.config.crawler.crawl_speed.page_timeout();
        let analyzed = match self.analyzer.analyze(&url.url, depth, timeout).await {
            Ok(analyzed) => analyzed,
            Err(e) => {
                warn!("Failed to load {}: {}", url.url, e);
                self.storage.visit_url(&url.url, None, 0, None)?;
                return Ok(None);
            }
        };

        let landing_url = if analyzed.landing_url.is_empty() {
            url.url.clone()
        } else {
            analyzed.landing_url.clone()
        };

        let mut page = WebPage::new(self.ids.allocate(), &landing_url, &analyzed.html);
        page.current_depth = depth;
        page.content = analyzed.content;
        page.timing_requests = analyzed.timing_requests;
        self.frontier.complete_urls(&mut page.content, &landing_url);
        self.storage.store_web_page(&page)?;

        let redirected_to = (analyzed.status_code != 200).then_some(landing_url.as_str());
        self.storage
            .visit_url(&url.url, Some(page.id), analyzed.status_code, redirected_to)?;
        info!(
            "Loaded {} as page {} (status {}, depth {}, {} clickables)",
            url.url,
            page.id,
            analyzed.status_code,
            depth,
            page.content.clickables.len()
        );

        for new_url in self.frontier.extract_new_links(&page.content.links, depth) {
            self.storage.insert_url(&new_url)?;
        }

        Ok(Some(Round {
            page: Page::Web(page),
            state: CrawlState::NormalPage,
            necessary_clicks: Vec::new(),
            previous_pages: Vec::new(),
        }))
    }

    /// Executes the clickables of a prepared round and records the result
    async fn explore(&mut self, round: Round) -> Result<()> {
        let Round {
            mut page,
            state,
            necessary_clicks,
            previous_pages,
        } = round;

        let clickables = self
            .execute_clickables(&mut page, &necessary_clicks, &previous_pages)
            .await?;
        page.content_mut().clickables = clickables;

        if let (CrawlState::NormalPage, Page::Web(web)) = (state, &page) {
            self.clustering.add_webpage(web);
        }
        Ok(())
    }

    /// Id the next stored page will receive
    pub fn next_page_id(&self) -> PageId {
        self.ids.peek()
    }
}

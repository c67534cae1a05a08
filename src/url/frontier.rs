//! The URL frontier handed to the exploration engine
//!
//! `DomainHandler` owns the set of every address seen during the crawl and a
//! FIFO of addresses still waiting for a normal-page fetch. Scope is decided
//! here too: a URL is in scope when its host matches one of the allowed domain
//! patterns and it contains none of the exclude patterns.

use crate::config::{Config, ScopeConfig};
use crate::crawler::{resolve_link, Frontier};
use crate::model::{CrawlUrl, Link, PageContent};
use crate::url::{extract_domain, matches_wildcard, normalize_url};
use crate::UrlError;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Frontier and scope for a single crawl session
#[derive(Debug)]
pub struct DomainHandler {
    allowed_domains: Vec<String>,
    exclude_patterns: Vec<String>,
    queue: VecDeque<CrawlUrl>,
    seen: HashSet<String>,
}

impl DomainHandler {
    /// Creates a frontier seeded with `start_url`
    ///
    /// When `scope.allowed_domains` is empty, only the start URL's host is in scope.
    pub fn new(start_url: &str, scope: &ScopeConfig) -> Result<Self, UrlError> {
        let start = normalize_url(start_url)?;
        let start_host = extract_domain(&start).ok_or(UrlError::MissingDomain)?;

        let allowed_domains = if scope.allowed_domains.is_empty() {
            vec![start_host]
        } else {
            scope
                .allowed_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect()
        };

        let mut handler = Self {
            allowed_domains,
            exclude_patterns: scope.exclude_patterns.clone(),
            queue: VecDeque::new(),
            seen: HashSet::new(),
        };
        handler.add_url(start.as_str(), None);

        Ok(handler)
    }

    pub fn from_config(config: &Config) -> Result<Self, UrlError> {
        Self::new(&config.crawler.start_url, &config.scope)
    }
}

impl Frontier for DomainHandler {
    fn create_url(&self, raw: &str, depth_of_finding: Option<u32>) -> Option<CrawlUrl> {
        match normalize_url(raw) {
            Ok(url) => Some(CrawlUrl::new(url.as_str(), depth_of_finding)),
            Err(e) => {
                tracing::trace!("Dropping address {}: {}", raw, e);
                None
            }
        }
    }

    fn is_in_scope(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = extract_domain(&parsed) else {
            return false;
        };

        if self.exclude_patterns.iter().any(|p| url.contains(p.as_str())) {
            return false;
        }

        self.allowed_domains
            .iter()
            .any(|pattern| matches_wildcard(pattern, &host))
    }

    fn add_url(&mut self, raw: &str, depth_of_finding: Option<u32>) -> Option<CrawlUrl> {
        let url = self.create_url(raw, depth_of_finding)?;
        if !self.seen.insert(url.url.clone()) {
            return None;
        }
        self.queue.push_back(url.clone());
        Some(url)
    }

    fn next_url_for_crawling(&mut self) -> Option<CrawlUrl> {
        self.queue.pop_front()
    }

    fn complete_urls(&self, content: &mut PageContent, base_url: &str) {
        let Ok(base) = Url::parse(base_url) else {
            tracing::warn!("Cannot resolve URLs against invalid base {}", base_url);
            return;
        };

        for link in &mut content.links {
            if let Some(absolute) = resolve_link(&link.url, &base) {
                link.url = absolute;
            }
        }
        for form in &mut content.forms {
            let action = if form.action.trim().is_empty() {
                Some(base.to_string())
            } else {
                resolve_link(&form.action, &base)
            };
            if let Some(absolute) = action {
                form.action = absolute;
            }
        }
        for request in &mut content.ajax_requests {
            if let Ok(absolute) = base.join(&request.url) {
                request.url = absolute.to_string();
            }
        }
    }

    fn extract_new_links(&mut self, links: &[Link], depth: u32) -> Vec<CrawlUrl> {
        let mut added = Vec::new();
        for link in links {
            let Some(candidate) = self.create_url(&link.url, Some(depth)) else {
                continue;
            };
            if !self.is_in_scope(&candidate.url) {
                continue;
            }
            if let Some(url) = self.add_url(&candidate.url, Some(depth)) {
                added.push(url);
            }
        }
        added
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

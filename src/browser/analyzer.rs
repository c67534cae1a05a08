use crate::browser::{collect_requests, install_request_hook, navigate, snapshot};
use crate::config::CrawlSpeed;
use crate::crawler::{build_http_client, is_html, probe_url, AnalyzedPage, Analyzer, ProbeResult};
use crate::{Result, RippleError};
use async_trait::async_trait;
use fantoccini::Client;
use std::time::Duration;
use tracing::debug;

/// Loads pages in the browser after probing their status over HTTP
pub struct WebDriverAnalyzer {
    client: Client,
    http: reqwest::Client,
    settle: Duration,
}

impl WebDriverAnalyzer {
    pub fn new(client: Client, speed: CrawlSpeed) -> Result<Self> {
        Ok(Self {
            client,
            http: build_http_client(speed.page_timeout())?,
            settle: speed.settle_time(),
        })
    }
}

#[async_trait]
impl Analyzer for WebDriverAnalyzer {
    async fn analyze(&mut self, url: &str, depth: u32, timeout: Duration) -> Result<AnalyzedPage> {
        let status_code = match probe_url(&self.http, url).await {
            ProbeResult::Reached {
                content_type: Some(content_type),
                ..
            } if !is_html(Some(&content_type)) => {
                return Err(RippleError::PageLoad {
                    url: url.to_string(),
                    message: format!("not an HTML document ({})", content_type),
                });
            }
            ProbeResult::Reached { status_code, .. } => status_code,
            ProbeResult::NetworkError { timed_out: true, .. } => {
                return Err(RippleError::Timeout { url: url.to_string() });
            }
            ProbeResult::NetworkError { error, .. } => {
                return Err(RippleError::PageLoad {
                    url: url.to_string(),
                    message: error,
                });
            }
        };

        navigate(&self.client, url, timeout).await?;
        // Requests fired while the page settles come from timers
        install_request_hook(&self.client, false).await?;
        tokio::time::sleep(self.settle).await;

        let timing_requests = collect_requests(&self.client).await?;
        let (landing_url, html, content) = snapshot(&self.client).await?;
        debug!(
            "Analyzed {} at depth {}: {} clickables, {} links, {} forms",
            landing_url,
            depth,
            content.clickables.len(),
            content.links.len(),
            content.forms.len()
        );

        Ok(AnalyzedPage {
            status_code,
            landing_url,
            html,
            content,
            timing_requests,
        })
    }
}

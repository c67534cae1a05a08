use crate::browser::script::{DispatchStatus, DISPATCH_EVENT};
use crate::browser::{browser_error, collect_requests, install_request_hook, navigate, snapshot};
use crate::config::CrawlSpeed;
use crate::crawler::{DeltaObservation, EventExecutor, EventOutcome, XhrMode};
use crate::model::{Clickable, Page};
use crate::{Result, RippleError};
use async_trait::async_trait;
use fantoccini::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};

/// Events the executor knows how to fire
pub const SUPPORTED_EVENTS: &[&str] = &[
    "click",
    "dblclick",
    "change",
    "input",
    "submit",
    "focus",
    "blur",
    "mouseover",
    "mouseout",
    "mousedown",
    "mouseup",
    "keydown",
    "keyup",
];

/// Replays interaction chains and fires events in the browser
pub struct WebDriverExecutor {
    client: Client,
    page_timeout: Duration,
    settle: Duration,
}

impl WebDriverExecutor {
    pub fn new(client: Client, speed: CrawlSpeed) -> Self {
        Self {
            client,
            page_timeout: speed.page_timeout(),
            settle: speed.settle_time(),
        }
    }

    async fn fire(&self, clickable: &Clickable) -> Result<DispatchStatus> {
        let value = self
            .client
            .execute(
                DISPATCH_EVENT,
                vec![json!(clickable.dom_address), json!(clickable.normalized_event())],
            )
            .await
            .map_err(|e| browser_error("dispatching event", e))?;
        let status = DispatchStatus::from_script_value(&value);
        trace!("{} on {}: {:?}", clickable.event, clickable.dom_address, status);
        Ok(status)
    }
}

/// Addresses compared without their fragment
fn same_document(a: &str, b: &str) -> bool {
    let strip = |u: &str| u.split('#').next().unwrap_or(u).trim_end_matches('/').to_string();
    strip(a) == strip(b)
}

#[async_trait]
impl EventExecutor for WebDriverExecutor {
    fn supported_events(&self) -> &[&'static str] {
        SUPPORTED_EVENTS
    }

    async fn execute(
        &mut self,
        page: &Page,
        clickable: &Clickable,
        necessary_clicks: &[Clickable],
        mode: XhrMode,
    ) -> Result<EventOutcome> {
        match navigate(&self.client, page.url(), self.page_timeout).await {
            Ok(()) => {}
            Err(e @ (RippleError::PageLoad { .. } | RippleError::Timeout { .. })) => {
                debug!("Initial load failed: {}", e);
                return Ok(EventOutcome::ErrorWhileInitialLoading);
            }
            Err(e) => return Err(e),
        }
        tokio::time::sleep(self.settle).await;

        // Earlier clicks are replayed with their backend calls let through
        install_request_hook(&self.client, false).await?;
        for previous in necessary_clicks {
            if self.fire(previous).await? != DispatchStatus::Fired {
                debug!("Could not replay {} {}", previous.event, previous.dom_address);
                return Ok(EventOutcome::PreviousClickNotFound);
            }
            tokio::time::sleep(self.settle).await;
        }

        install_request_hook(&self.client, mode == XhrMode::Intercept).await?;
        let before = self
            .client
            .current_url()
            .await
            .map_err(|e| browser_error("reading current url", e))?;

        match self.fire(clickable).await? {
            DispatchStatus::Fired => {}
            DispatchStatus::Unsupported => return Ok(EventOutcome::UnsupportedTag),
            DispatchStatus::Missing | DispatchStatus::Failed => {
                return Ok(EventOutcome::TargetElementNotFound)
            }
        }
        tokio::time::sleep(self.settle).await;

        let after = self
            .client
            .current_url()
            .await
            .map_err(|e| browser_error("reading current url", e))?;
        if !same_document(before.as_str(), after.as_str()) {
            return Ok(EventOutcome::UrlChanged(after.to_string()));
        }

        let requests = collect_requests(&self.client).await?;
        let (url, html, mut content) = snapshot(&self.client).await?;
        content.ajax_requests = requests;

        Ok(EventOutcome::Delta(DeltaObservation { url, html, content }))
    }
}

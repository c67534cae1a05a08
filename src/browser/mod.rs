//! WebDriver-backed collaborators
//!
//! The analyzer, the event executor and the form handler all drive the same
//! browser session; each holds a clone of the `fantoccini` client handle.

mod analyzer;
mod executor;
mod forms;
mod script;

pub use analyzer::WebDriverAnalyzer;
pub use executor::{WebDriverExecutor, SUPPORTED_EVENTS};
pub use forms::WebDriverFormHandler;
pub use script::{parse_requests, DispatchStatus};

use crate::config::BrowserConfig;
use crate::crawler::parse_content;
use crate::model::{AjaxRequest, PageContent};
use crate::{Result, RippleError};
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::time::Duration;

/// Opens a browser session on the configured WebDriver endpoint
pub async fn connect(config: &BrowserConfig) -> Result<Client> {
    tracing::info!("Connecting to WebDriver at {}", config.webdriver_url);
    ClientBuilder::native()
        .connect(&config.webdriver_url)
        .await
        .map_err(|e| {
            RippleError::Browser(format!(
                "cannot open a session on {}: {}",
                config.webdriver_url, e
            ))
        })
}

pub(crate) fn browser_error(context: &str, error: CmdError) -> RippleError {
    RippleError::Browser(format!("{}: {}", context, error))
}

/// Navigates to `url`, giving up after `timeout`
pub(crate) async fn navigate(client: &Client, url: &str, timeout: Duration) -> Result<()> {
    match tokio::time::timeout(timeout, client.goto(url)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(RippleError::PageLoad {
            url: url.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Err(RippleError::Timeout {
            url: url.to_string(),
        }),
    }
}

/// (Re)arms the request hook on the current document
pub(crate) async fn install_request_hook(client: &Client, intercept: bool) -> Result<()> {
    client
        .execute(script::INSTALL_REQUEST_HOOK, vec![json!(intercept)])
        .await
        .map_err(|e| browser_error("installing request hook", e))?;
    Ok(())
}

pub(crate) async fn collect_requests(client: &Client) -> Result<Vec<AjaxRequest>> {
    let value = client
        .execute(script::COLLECT_REQUESTS, Vec::new())
        .await
        .map_err(|e| browser_error("collecting requests", e))?;
    Ok(parse_requests(value))
}

/// Current address, markup and extracted content of the browser
pub(crate) async fn snapshot(client: &Client) -> Result<(String, String, PageContent)> {
    let current = client
        .current_url()
        .await
        .map_err(|e| browser_error("reading current url", e))?;
    let html = client
        .source()
        .await
        .map_err(|e| browser_error("reading page source", e))?;
    let content = parse_content(&html, &current);
    Ok((current.to_string(), html, content))
}

//! HTTP status probe
//!
//! A browser session does not expose response codes, so before a normal page
//! is rendered it is requested once over plain HTTP to learn:
//! - the status code
//! - the landing URL after redirects
//! - the Content-Type header

use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Result of probing a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// The server answered, whatever the status code
    Reached {
        status_code: u16,
        /// Final URL after redirects
        landing_url: String,
        content_type: Option<String>,
    },

    /// No HTTP response was received
    NetworkError { error: String, timed_out: bool },
}

/// Returns true if a response with `content_type` can be rendered as a page
///
/// A missing header is accepted; browsers sniff such documents as HTML.
pub fn is_html(content_type: Option<&str>) -> bool {
    content_type.map_or(true, |ct| {
        let ct = ct.to_ascii_lowercase();
        ct.contains("text/html") || ct.contains("application/xhtml+xml")
    })
}

/// Builds the HTTP client used for probing
///
/// # Arguments
///
/// * `timeout` - Total request budget, taken from the crawl speed
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let user_agent = format!("delta-ripple/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Requests `url` once and reports where it landed
pub async fn probe_url(client: &Client, url: &str) -> ProbeResult {
    match client.get(url).send().await {
        Ok(response) => {
            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            ProbeResult::Reached {
                status_code: response.status().as_u16(),
                landing_url: response.url().to_string(),
                content_type,
            }
        }
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else {
                e.to_string()
            };
            ProbeResult::NetworkError {
                error,
                timed_out: e.is_timeout(),
            }
        }
    }
}

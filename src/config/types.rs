use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Delta-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub login: Option<LoginConfig>,
    #[serde(default)]
    pub browser: BrowserConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the crawl starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Maximum interaction-free depth to crawl from the start page
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of chained interactions explored below a page
    #[serde(rename = "max-delta-depth", default = "default_max_delta_depth")]
    pub max_delta_depth: u32,

    /// Controls page load timeouts and how long the DOM is allowed to settle
    #[serde(rename = "crawl-speed", default)]
    pub crawl_speed: CrawlSpeed,

    /// Retry budget of the clickable execution loop
    #[serde(rename = "max-click-retries", default = "default_max_click_retries")]
    pub max_click_retries: u32,

    /// Share of failed pre-clicks on a page that triggers a session check
    #[serde(rename = "error-ratio-threshold", default = "default_error_ratio")]
    pub error_ratio_threshold: f64,
}

/// How aggressively the browser is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlSpeed {
    Slow,
    #[default]
    Medium,
    Fast,
    SpeedOfLight,
}

impl CrawlSpeed {
    /// Timeout budget handed to the analyzer for a normal page load
    pub fn page_timeout(&self) -> Duration {
        match self {
            Self::Slow => Duration::from_secs(40),
            Self::Medium => Duration::from_secs(20),
            Self::Fast => Duration::from_secs(10),
            Self::SpeedOfLight => Duration::from_secs(5),
        }
    }

    /// Time the DOM is given to settle after a navigation or an event
    pub fn settle_time(&self) -> Duration {
        match self {
            Self::Slow => Duration::from_millis(3000),
            Self::Medium => Duration::from_millis(1000),
            Self::Fast => Duration::from_millis(300),
            Self::SpeedOfLight => Duration::from_millis(50),
        }
    }
}

/// Thresholds and weights for the similarity oracle
#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityConfig {
    /// Deltas scoring at or above this against a known delta are suppressed
    #[serde(rename = "duplicate-threshold", default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,

    /// A landing page scoring below this against the login page means login worked
    #[serde(rename = "login-change-threshold", default = "default_login_threshold")]
    pub login_change_threshold: f64,

    #[serde(rename = "clickable-weight", default = "default_weight")]
    pub clickable_weight: f64,

    #[serde(rename = "form-weight", default = "default_weight")]
    pub form_weight: f64,

    #[serde(rename = "link-weight", default = "default_weight")]
    pub link_weight: f64,

    /// Minimum score for a page to join an existing cluster
    #[serde(rename = "cluster-threshold", default = "default_cluster_threshold")]
    pub cluster_threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: default_duplicate_threshold(),
            login_change_threshold: default_login_threshold(),
            clickable_weight: default_weight(),
            form_weight: default_weight(),
            link_weight: default_weight(),
            cluster_threshold: default_cluster_threshold(),
        }
    }
}

/// Which URLs belong to the crawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScopeConfig {
    /// Host patterns (e.g., "example.com" or "*.example.com"); empty means the start host
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// URLs containing any of these substrings are never crawled
    #[serde(rename = "exclude-patterns", default)]
    pub exclude_patterns: Vec<String>,
}

/// Credentials used for the initial login and for re-authentication
#[derive(Debug, Clone, Deserialize)]
pub struct LoginConfig {
    /// Page that hosts the login form
    #[serde(rename = "url-with-login-form")]
    pub url_with_login_form: String,

    /// Name shown in logs
    pub username: String,

    /// Form field name -> value
    pub data: BTreeMap<String, String>,
}

/// WebDriver connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(rename = "webdriver-url", default = "default_webdriver_url")]
    pub webdriver_url: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown crawl report
    #[serde(rename = "report-path")]
    pub report_path: String,
}

fn default_max_delta_depth() -> u32 {
    5
}

fn default_max_click_retries() -> u32 {
    5
}

fn default_error_ratio() -> f64 {
    0.2
}

fn default_duplicate_threshold() -> f64 {
    0.9
}

fn default_login_threshold() -> f64 {
    0.5
}

fn default_weight() -> f64 {
    1.0
}

fn default_cluster_threshold() -> f64 {
    0.8
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

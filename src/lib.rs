//! Delta-Ripple: a state explorer for dynamic web applications
//!
//! This crate drives a browser through a web application by executing its
//! clickable elements one at a time, recording every resulting DOM change as a
//! delta page relative to its parent, and exploring new interactive states
//! until the URL frontier and the pending delta queue are both exhausted.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Delta-Ripple operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Failed to load {url}: {message}")]
    PageLoad { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Ancestor page {page_id} not found while walking a delta chain")]
    AncestorNotFound { page_id: i64 },

    #[error("Delta chain of page {page_id} exceeds {limit} ancestors")]
    AncestorChainTooLong { page_id: i64, limit: u32 },

    #[error("Form submission failed: {0}")]
    FormSubmission(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Delta-Ripple operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Collaborators, Crawler};
pub use model::{Clickable, ClickableType, DeltaPage, Page, PageContent, WebPage};
pub use url::{extract_domain, normalize_url, DomainHandler};

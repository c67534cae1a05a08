//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Web page and delta page persistence
//! - Per-clickable classification state
//! - URL discovery and visit bookkeeping
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Persistence, StorageError, StorageResult};

use crate::model::PageId;

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Number of stored pages per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCounts {
    pub web: u64,
    pub delta: u64,
}

impl PageCounts {
    pub fn total(&self) -> u64 {
        self.web + self.delta
    }
}

/// URL bookkeeping totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlCounts {
    pub discovered: u64,
    pub visited: u64,
    /// Visited with a status other than 200
    pub failed: u64,
}

/// A stored page without its markup
#[derive(Debug, Clone)]
pub struct PageSummary {
    pub id: PageId,
    pub is_delta: bool,
    pub url: String,
    pub current_depth: u32,
    pub delta_depth: u32,
    pub parent_id: Option<PageId>,
    /// Event and locator of the generating clickable, delta pages only
    pub generator: Option<String>,
    pub clickable_count: u64,
    pub link_count: u64,
    pub form_count: u64,
}

/// A URL row
#[derive(Debug, Clone)]
pub struct UrlRecord {
    pub url: String,
    pub depth_of_finding: Option<u32>,
    pub response_code: Option<u16>,
    pub landing_url: Option<String>,
    pub page_id: Option<PageId>,
}

//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Persistence trait.

use crate::model::{
    AjaxRequest, Clickable, ClickableType, CrawlUrl, DeltaPage, Page, PageContent, PageId, WebPage,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Persistence, StorageError, StorageResult};
use crate::storage::{PageCounts, PageSummary, RunRecord, RunStatus, UrlCounts, UrlRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

/// Raw `pages` row before the JSON columns are decoded
struct PageRow {
    id: PageId,
    kind: String,
    url: String,
    html: String,
    current_depth: u32,
    delta_depth: u32,
    parent_id: Option<PageId>,
    generator: Option<String>,
    generator_requests: String,
    links: String,
    forms: String,
    ajax_requests: String,
    timing_requests: String,
}

const PAGE_COLUMNS: &str = "id, kind, url, html, current_depth, delta_depth, parent_id, generator,
     generator_requests, links, forms, ajax_requests, timing_requests";

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Removes every page, clickable and URL; run history is kept
    pub fn clear(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM clickables;
            DELETE FROM pages;
            DELETE FROM urls;
        ",
        )?;
        Ok(())
    }

    fn insert_page(
        &mut self,
        page: &PageRecordRef<'_>,
        clickables: &[Clickable],
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO pages (id, kind, url, html, current_depth, delta_depth, parent_id,
             generator, generator_requests, links, forms, ajax_requests, timing_requests, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                page.id,
                page.kind,
                page.url,
                page.html,
                page.current_depth,
                page.delta_depth,
                page.parent_id,
                page.generator,
                page.generator_requests,
                page.links,
                page.forms,
                page.ajax_requests,
                page.timing_requests,
                Utc::now().to_rfc3339(),
            ],
        )?;

        for (position, clickable) in clickables.iter().enumerate() {
            upsert_clickable(&tx, page.id, Some(position as i64), clickable)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn load_page(&self, row: PageRow) -> StorageResult<Page> {
        let clickables = self.get_clickables(row.id)?;
        let content = PageContent {
            clickables,
            links: serde_json::from_str(&row.links)?,
            forms: serde_json::from_str(&row.forms)?,
            ajax_requests: serde_json::from_str(&row.ajax_requests)?,
        };

        match row.kind.as_str() {
            "web" => Ok(Page::Web(WebPage {
                id: row.id,
                url: row.url,
                html: row.html,
                current_depth: row.current_depth,
                content,
                timing_requests: serde_json::from_str(&row.timing_requests)?,
            })),
            "delta" => {
                let parent_id = row.parent_id.ok_or_else(|| {
                    StorageError::CorruptRecord(format!("delta page {} has no parent", row.id))
                })?;
                let generator = match &row.generator {
                    Some(json) => serde_json::from_str(json)?,
                    None => {
                        return Err(StorageError::CorruptRecord(format!(
                            "delta page {} has no generator",
                            row.id
                        )))
                    }
                };
                Ok(Page::Delta(DeltaPage {
                    id: row.id,
                    url: row.url,
                    html: row.html,
                    current_depth: row.current_depth,
                    delta_depth: row.delta_depth,
                    parent_id,
                    generator,
                    generator_requests: serde_json::from_str(&row.generator_requests)?,
                    content,
                }))
            }
            other => Err(StorageError::CorruptRecord(format!(
                "page {} has unknown kind '{}'",
                row.id, other
            ))),
        }
    }
}

/// Column values of a page about to be inserted
struct PageRecordRef<'a> {
    id: PageId,
    kind: &'static str,
    url: &'a str,
    html: &'a str,
    current_depth: u32,
    delta_depth: u32,
    parent_id: Option<PageId>,
    generator: Option<String>,
    generator_requests: String,
    links: String,
    forms: String,
    ajax_requests: String,
    timing_requests: String,
}

fn page_row(row: &Row<'_>) -> rusqlite::Result<PageRow> {
    Ok(PageRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        url: row.get(2)?,
        html: row.get(3)?,
        current_depth: row.get(4)?,
        delta_depth: row.get(5)?,
        parent_id: row.get(6)?,
        generator: row.get(7)?,
        generator_requests: row.get(8)?,
        links: row.get(9)?,
        forms: row.get(10)?,
        ajax_requests: row.get(11)?,
        timing_requests: row.get(12)?,
    })
}

fn clickable_row(row: &Row<'_>) -> rusqlite::Result<Clickable> {
    Ok(Clickable {
        event: row.get(0)?,
        tag: row.get(1)?,
        dom_address: row.get(2)?,
        html_id: row.get(3)?,
        html_class: row.get(4)?,
        clickable_type: ClickableType::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or_default(),
        clicked: row.get(6)?,
        clickable_depth: row.get(7)?,
        links_to: row.get(8)?,
    })
}

/// Inserts a clickable or updates the classification of an existing one
///
/// New clickables without an explicit position are appended after the
/// page's last clickable.
fn upsert_clickable(
    conn: &Connection,
    page_id: PageId,
    position: Option<i64>,
    clickable: &Clickable,
) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO clickables (page_id, position, locator, event, tag, dom_address, html_id,
         html_class, clickable_type, clicked, clickable_depth, links_to)
         VALUES (?1,
                 COALESCE(?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM clickables WHERE page_id = ?1)),
                 ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(page_id, locator) DO UPDATE SET
             clickable_type = excluded.clickable_type,
             clicked = excluded.clicked,
             clickable_depth = excluded.clickable_depth,
             links_to = excluded.links_to",
        params![
            page_id,
            position,
            clickable.locator(),
            clickable.event,
            clickable.tag,
            clickable.dom_address,
            clickable.html_id,
            clickable.html_class,
            clickable.clickable_type.to_db_string(),
            clickable.clicked,
            clickable.clickable_depth,
            clickable.links_to,
        ],
    )?;
    Ok(())
}

impl Persistence for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Failed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Running),
                    })
                },
            )
            .optional()?;

        Ok(run)
    }

    // ===== URLs =====

    fn insert_url(&mut self, url: &CrawlUrl) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO urls (url, depth_of_finding, discovered_at) VALUES (?1, ?2, ?3)",
            params![url.url, url.depth_of_finding, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn visit_url(
        &mut self,
        url: &str,
        page_id: Option<PageId>,
        status: u16,
        landing_url: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO urls (url, discovered_at, visited_at, response_code, landing_url, page_id)
             VALUES (?1, ?2, ?2, ?3, ?4, ?5)
             ON CONFLICT(url) DO UPDATE SET
                 visited_at = excluded.visited_at,
                 response_code = excluded.response_code,
                 landing_url = excluded.landing_url,
                 page_id = excluded.page_id",
            params![url, now, status, landing_url, page_id],
        )?;
        Ok(())
    }

    // ===== Pages =====

    fn store_web_page(&mut self, page: &WebPage) -> StorageResult<()> {
        let record = PageRecordRef {
            id: page.id,
            kind: "web",
            url: &page.url,
            html: &page.html,
            current_depth: page.current_depth,
            delta_depth: 0,
            parent_id: None,
            generator: None,
            generator_requests: "[]".to_string(),
            links: serde_json::to_string(&page.content.links)?,
            forms: serde_json::to_string(&page.content.forms)?,
            ajax_requests: serde_json::to_string(&page.content.ajax_requests)?,
            timing_requests: serde_json::to_string(&page.timing_requests)?,
        };
        self.insert_page(&record, &page.content.clickables)
    }

    fn store_delta_page(&mut self, page: &DeltaPage) -> StorageResult<()> {
        let record = PageRecordRef {
            id: page.id,
            kind: "delta",
            url: &page.url,
            html: &page.html,
            current_depth: page.current_depth,
            delta_depth: page.delta_depth,
            parent_id: Some(page.parent_id),
            generator: Some(serde_json::to_string(&page.generator)?),
            generator_requests: serde_json::to_string(&page.generator_requests)?,
            links: serde_json::to_string(&page.content.links)?,
            forms: serde_json::to_string(&page.content.forms)?,
            ajax_requests: serde_json::to_string(&page.content.ajax_requests)?,
            timing_requests: "[]".to_string(),
        };
        self.insert_page(&record, &page.content.clickables)
    }

    fn update_clickable(&mut self, page_id: PageId, clickable: &Clickable) -> StorageResult<()> {
        upsert_clickable(&self.conn, page_id, None, clickable)
    }

    fn get_page_by_id(&self, id: PageId) -> StorageResult<Option<Page>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS),
                params![id],
                page_row,
            )
            .optional()?;

        row.map(|row| self.load_page(row)).transpose()
    }

    fn get_crawled_delta_pages(&self, url: &str) -> StorageResult<Vec<DeltaPage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pages WHERE kind = 'delta' AND url = ?1 ORDER BY id",
            PAGE_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![url], page_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut pages = Vec::with_capacity(rows.len());
        for row in rows {
            if let Page::Delta(page) = self.load_page(row)? {
                pages.push(page);
            }
        }
        Ok(pages)
    }

    fn extend_ajax_requests(
        &mut self,
        page_id: PageId,
        requests: &[AjaxRequest],
    ) -> StorageResult<()> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT ajax_requests FROM pages WHERE id = ?1",
                params![page_id],
                |row| row.get(0),
            )
            .optional()?;

        let existing = existing.ok_or(StorageError::PageNotFound(page_id))?;
        let mut log: Vec<AjaxRequest> = serde_json::from_str(&existing)?;
        log.extend(requests.iter().cloned());

        self.conn.execute(
            "UPDATE pages SET ajax_requests = ?1 WHERE id = ?2",
            params![serde_json::to_string(&log)?, page_id],
        )?;
        Ok(())
    }

    fn max_page_id(&self) -> StorageResult<Option<PageId>> {
        let max = self
            .conn
            .query_row("SELECT MAX(id) FROM pages", [], |row| row.get(0))?;
        Ok(max)
    }

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<PageCounts> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM pages GROUP BY kind")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = PageCounts::default();
        for row in rows {
            let (kind, count) = row?;
            match kind.as_str() {
                "web" => counts.web = count as u64,
                "delta" => counts.delta = count as u64,
                _ => {}
            }
        }
        Ok(counts)
    }

    fn count_clickables_by_type(&self) -> StorageResult<HashMap<ClickableType, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT clickable_type, COUNT(*) FROM clickables GROUP BY clickable_type")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut summary = HashMap::new();
        for row in rows {
            let (type_str, count) = row?;
            if let Some(clickable_type) = ClickableType::from_db_string(&type_str) {
                summary.insert(clickable_type, count as u64);
            }
        }
        Ok(summary)
    }

    fn count_urls(&self) -> StorageResult<UrlCounts> {
        let (discovered, visited, failed): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COUNT(visited_at),
                    COUNT(CASE WHEN visited_at IS NOT NULL AND response_code != 200 THEN 1 END)
             FROM urls",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(UrlCounts {
            discovered: discovered as u64,
            visited: visited as u64,
            failed: failed as u64,
        })
    }

    fn list_pages(&self) -> StorageResult<Vec<PageSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.kind, p.url, p.current_depth, p.delta_depth, p.parent_id, p.generator,
                    (SELECT COUNT(*) FROM clickables c WHERE c.page_id = p.id),
                    json_array_length(p.links),
                    json_array_length(p.forms)
             FROM pages p
             ORDER BY p.id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, PageId>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, Option<PageId>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, i64>(9)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut pages = Vec::with_capacity(rows.len());
        for (id, kind, url, current_depth, delta_depth, parent_id, generator, clickables, links, forms) in rows {
            let generator = match generator {
                Some(json) => {
                    let clickable: Clickable = serde_json::from_str(&json)?;
                    Some(format!("{} on {}", clickable.event, clickable.dom_address))
                }
                None => None,
            };
            pages.push(PageSummary {
                id,
                is_delta: kind == "delta",
                url,
                current_depth,
                delta_depth,
                parent_id,
                generator,
                clickable_count: clickables as u64,
                link_count: links as u64,
                form_count: forms as u64,
            });
        }
        Ok(pages)
    }

    fn list_urls(&self) -> StorageResult<Vec<UrlRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, depth_of_finding, response_code, landing_url, page_id FROM urls ORDER BY id",
        )?;

        let urls = stmt
            .query_map([], |row| {
                Ok(UrlRecord {
                    url: row.get(0)?,
                    depth_of_finding: row.get(1)?,
                    response_code: row.get(2)?,
                    landing_url: row.get(3)?,
                    page_id: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(urls)
    }

    fn get_clickables(&self, page_id: PageId) -> StorageResult<Vec<Clickable>> {
        let mut stmt = self.conn.prepare(
            "SELECT event, tag, dom_address, html_id, html_class, clickable_type, clicked,
                    clickable_depth, links_to
             FROM clickables WHERE page_id = ?1 ORDER BY position",
        )?;

        let clickables = stmt
            .query_map(params![page_id], clickable_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(clickables)
    }
}

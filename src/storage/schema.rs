//! Database schema definitions
//!
//! Web pages and delta pages share the `pages` table. Content collections
//! other than clickables are kept as JSON columns; clickables get their own
//! rows so their classification can be updated one at a time.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Every URL the frontier handed out or discovered
CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    depth_of_finding INTEGER,
    discovered_at TEXT NOT NULL,
    visited_at TEXT,
    response_code INTEGER,
    landing_url TEXT,
    page_id INTEGER
);

-- Web pages (kind = 'web') and delta pages (kind = 'delta')
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    url TEXT NOT NULL,
    html TEXT NOT NULL,
    current_depth INTEGER NOT NULL,
    delta_depth INTEGER NOT NULL DEFAULT 0,
    parent_id INTEGER,
    generator TEXT,
    generator_requests TEXT NOT NULL DEFAULT '[]',
    links TEXT NOT NULL DEFAULT '[]',
    forms TEXT NOT NULL DEFAULT '[]',
    ajax_requests TEXT NOT NULL DEFAULT '[]',
    timing_requests TEXT NOT NULL DEFAULT '[]',
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_url ON pages(url);
CREATE INDEX IF NOT EXISTS idx_pages_parent ON pages(parent_id);

-- Clickables per page with their current classification
CREATE TABLE IF NOT EXISTS clickables (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id),
    position INTEGER NOT NULL,
    locator TEXT NOT NULL,
    event TEXT NOT NULL,
    tag TEXT NOT NULL,
    dom_address TEXT NOT NULL,
    html_id TEXT,
    html_class TEXT,
    clickable_type TEXT NOT NULL,
    clicked INTEGER NOT NULL DEFAULT 0,
    clickable_depth INTEGER,
    links_to TEXT,
    UNIQUE(page_id, locator)
);

CREATE INDEX IF NOT EXISTS idx_clickables_page ON clickables(page_id);
CREATE INDEX IF NOT EXISTS idx_clickables_type ON clickables(clickable_type);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["runs", "urls", "pages", "clickables"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}

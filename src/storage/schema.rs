//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the analyzer database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- URLs registered for analysis
CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'queued',
    error_message TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_urls_status ON urls(status);

-- One row per successful crawl
CREATE TABLE IF NOT EXISTS crawl_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_id INTEGER NOT NULL REFERENCES urls(id) ON DELETE CASCADE,
    title TEXT,
    html_version TEXT,
    h1_count INTEGER NOT NULL DEFAULT 0,
    h2_count INTEGER NOT NULL DEFAULT 0,
    h3_count INTEGER NOT NULL DEFAULT 0,
    h4_count INTEGER NOT NULL DEFAULT 0,
    h5_count INTEGER NOT NULL DEFAULT 0,
    h6_count INTEGER NOT NULL DEFAULT 0,
    internal_links INTEGER NOT NULL DEFAULT 0,
    external_links INTEGER NOT NULL DEFAULT 0,
    broken_links_count INTEGER NOT NULL DEFAULT 0,
    has_login_form INTEGER NOT NULL DEFAULT 0,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_results_url ON crawl_results(url_id);

-- Broken links found by a crawl
CREATE TABLE IF NOT EXISTS broken_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crawl_result_id INTEGER NOT NULL REFERENCES crawl_results(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    error_message TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_broken_links_result ON broken_links(crawl_result_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

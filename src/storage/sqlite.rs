//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Repository trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Repository, StorageError, StorageResult};
use crate::storage::{BrokenLinkRecord, CrawlResultRecord, UrlRecord, UrlStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const URL_COLUMNS: &str = "id, url, status, error_message, created_at, updated_at";

const CRAWL_RESULT_COLUMNS: &str = "id, url_id, title, html_version, h1_count, h2_count, \
     h3_count, h4_count, h5_count, h6_count, internal_links, external_links, \
     broken_links_count, has_login_form, crawled_at";

/// SQLite storage backend
///
/// The connection sits behind a mutex so one repository can be shared by the
/// service and all of its background crawl tasks.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Opens or creates a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn url_from_row(row: &Row<'_>) -> rusqlite::Result<UrlRecord> {
    Ok(UrlRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        status: UrlStatus::from_db_string(&row.get::<_, String>(2)?).unwrap_or(UrlStatus::Queued),
        error_message: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn crawl_result_from_row(row: &Row<'_>) -> rusqlite::Result<CrawlResultRecord> {
    Ok(CrawlResultRecord {
        id: row.get(0)?,
        url_id: row.get(1)?,
        title: row.get(2)?,
        html_version: row.get(3)?,
        h1_count: row.get(4)?,
        h2_count: row.get(5)?,
        h3_count: row.get(6)?,
        h4_count: row.get(7)?,
        h5_count: row.get(8)?,
        h6_count: row.get(9)?,
        internal_links: row.get(10)?,
        external_links: row.get(11)?,
        broken_links_count: row.get(12)?,
        has_login_form: row.get(13)?,
        crawled_at: row.get(14)?,
    })
}

impl Repository for SqliteRepository {
    // ===== URL Records =====

    fn create_url(&self, url: &str) -> StorageResult<UrlRecord> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO urls (url, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![url, UrlStatus::Queued.to_db_string(), now],
        )?;

        Ok(UrlRecord {
            id: conn.last_insert_rowid(),
            url: url.to_string(),
            status: UrlStatus::Queued,
            error_message: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    fn get_url_by_id(&self, id: i64) -> StorageResult<UrlRecord> {
        let conn = self.conn();
        let record = conn
            .query_row(
                &format!("SELECT {} FROM urls WHERE id = ?1", URL_COLUMNS),
                params![id],
                url_from_row,
            )
            .optional()?;

        record.ok_or(StorageError::UrlNotFound(id))
    }

    fn get_url_by_url(&self, url: &str) -> StorageResult<Option<UrlRecord>> {
        let conn = self.conn();
        let record = conn
            .query_row(
                &format!("SELECT {} FROM urls WHERE url = ?1", URL_COLUMNS),
                params![url],
                url_from_row,
            )
            .optional()?;

        Ok(record)
    }

    fn update_url_status(
        &self,
        id: i64,
        status: UrlStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn().execute(
            "UPDATE urls SET status = ?1, error_message = ?2, updated_at = ?3 WHERE id = ?4",
            params![status.to_db_string(), error_message, now, id],
        )?;

        if updated == 0 {
            return Err(StorageError::UrlNotFound(id));
        }
        Ok(())
    }

    // ===== Crawl Results =====

    fn create_crawl_result(&self, result: &mut CrawlResultRecord) -> StorageResult<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO crawl_results (url_id, title, html_version, h1_count, h2_count, \
             h3_count, h4_count, h5_count, h6_count, internal_links, external_links, \
             broken_links_count, has_login_form, crawled_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                result.url_id,
                result.title,
                result.html_version,
                result.h1_count,
                result.h2_count,
                result.h3_count,
                result.h4_count,
                result.h5_count,
                result.h6_count,
                result.internal_links,
                result.external_links,
                result.broken_links_count,
                result.has_login_form,
                result.crawled_at,
            ],
        )?;
        result.id = conn.last_insert_rowid();
        Ok(())
    }

    fn get_crawl_result_by_url_id(&self, url_id: i64) -> StorageResult<Option<CrawlResultRecord>> {
        let conn = self.conn();
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM crawl_results WHERE url_id = ?1 ORDER BY id DESC LIMIT 1",
                    CRAWL_RESULT_COLUMNS
                ),
                params![url_id],
                crawl_result_from_row,
            )
            .optional()?;

        Ok(record)
    }

    // ===== Broken Links =====

    fn create_broken_links(
        &self,
        crawl_result_id: i64,
        links: &[BrokenLinkRecord],
    ) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO broken_links (crawl_result_id, url, status_code, error_message) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for link in links {
                stmt.execute(params![
                    crawl_result_id,
                    link.url,
                    link.status_code,
                    link.error_message
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_broken_links_by_url_id(&self, url_id: i64) -> StorageResult<Vec<BrokenLinkRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT b.id, b.crawl_result_id, b.url, b.status_code, b.error_message
             FROM broken_links b
             WHERE b.crawl_result_id = (
                 SELECT MAX(id) FROM crawl_results WHERE url_id = ?1
             )
             ORDER BY b.id",
        )?;

        let links = stmt
            .query_map(params![url_id], |row| {
                Ok(BrokenLinkRecord {
                    id: row.get(0)?,
                    crawl_result_id: row.get(1)?,
                    url: row.get(2)?,
                    status_code: row.get(3)?,
                    error_message: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }
}

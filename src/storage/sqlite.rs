//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::config::validate_table_name;
use crate::output::RunSummary;
use crate::storage::schema::{company_table_sql, initialize_schema};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    DocumentRecord, ExtractedFileRecord, PageRecord, RunRecord, RunStatus, StoredRecord,
    UpsertOutcome,
};
use crate::CrawlerError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CrawlerError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlerError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Concurrent company runs each hold their own connection
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, CrawlerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn checked_table(table: &str) -> StorageResult<&str> {
    validate_table_name(table).map_err(|_| StorageError::InvalidTable(table.to_string()))?;
    Ok(table)
}

fn to_json_array(items: &[String]) -> StorageResult<Option<String>> {
    if items.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(items)?))
    }
}

fn from_json_array(text: Option<String>) -> Vec<String> {
    text.and_then(|t| serde_json::from_str(&t).ok())
        .unwrap_or_default()
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let summary: Option<String> = row.get(6)?;
    Ok(RunRecord {
        id: row.get(0)?,
        company: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Failed),
        summary: summary.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

impl Storage for SqliteStorage {
    // ===== Company Tables =====

    fn ensure_table(&mut self, table: &str) -> StorageResult<()> {
        let table = checked_table(table)?;
        self.conn.execute_batch(&company_table_sql(table))?;
        Ok(())
    }

    fn known_urls(&self, table: &str) -> StorageResult<HashSet<String>> {
        let table = checked_table(table)?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT link FROM {}", table))?;

        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(urls)
    }

    fn contains_url(&self, table: &str, url: &str) -> StorageResult<bool> {
        let table = checked_table(table)?;
        let existing: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT id FROM {} WHERE link = ?1", table),
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(existing.is_some())
    }

    fn upsert_page(&mut self, table: &str, page: &PageRecord) -> StorageResult<UpsertOutcome> {
        let table = checked_table(table)?;
        let images = to_json_array(&page.images)?;
        let tags = to_json_array(&page.tags)?;

        let tx = self.conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                &format!("SELECT id FROM {} WHERE link = ?1", table),
                params![page.url],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = if existing.is_some() {
            tx.execute(
                &format!(
                    "UPDATE {} SET content = ?1, images = ?2, tags = ?3, dt_download = ?4,
                     local_path = ?5 WHERE link = ?6",
                    table
                ),
                params![page.content, images, tags, now(), page.local_path, page.url],
            )?;
            UpsertOutcome::Updated
        } else {
            tx.execute(
                &format!(
                    "INSERT INTO {} (content, link, images, tags, dt_download, local_path)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    table
                ),
                params![page.content, page.url, images, tags, now(), page.local_path],
            )?;
            UpsertOutcome::Inserted
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn upsert_document(
        &mut self,
        table: &str,
        document: &DocumentRecord,
    ) -> StorageResult<UpsertOutcome> {
        let table = checked_table(table)?;
        let tags = to_json_array(&document.tags)?;

        let tx = self.conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                &format!("SELECT id FROM {} WHERE link = ?1", table),
                params![document.url],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = if existing.is_some() {
            tx.execute(
                &format!(
                    "UPDATE {} SET content = ?1, local_path = ?2, tags = ?3, dt_download = ?4
                     WHERE link = ?5",
                    table
                ),
                params![document.content, document.local_path, tags, now(), document.url],
            )?;
            UpsertOutcome::Updated
        } else {
            tx.execute(
                &format!(
                    "INSERT INTO {} (content, link, tags, dt_download, local_path)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    table
                ),
                params![document.content, document.url, tags, now(), document.local_path],
            )?;
            UpsertOutcome::Inserted
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn insert_extracted(&mut self, table: &str, file: &ExtractedFileRecord) -> StorageResult<()> {
        let table = checked_table(table)?;
        let tags = to_json_array(&file.tags)?;

        let tx = self.conn.transaction()?;

        let parent: Option<i64> = tx
            .query_row(
                &format!("SELECT id FROM {} WHERE link = ?1", table),
                params![file.parent_url],
                |row| row.get(0),
            )
            .optional()?;

        if parent.is_none() {
            return Err(StorageError::MissingParent {
                url: file.url.clone(),
                parent: file.parent_url.clone(),
            });
        }

        tx.execute(
            &format!(
                "INSERT INTO {} (content, link, tags, dt_download, local_path, parent_document)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                table
            ),
            params![
                file.content,
                file.url,
                tags,
                now(),
                file.local_path,
                file.parent_url
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_record(&self, table: &str, url: &str) -> StorageResult<Option<StoredRecord>> {
        let table = checked_table(table)?;
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, link, content, images, tags, dt_download, local_path, parent_document
                     FROM {} WHERE link = ?1",
                    table
                ),
                params![url],
                |row| {
                    Ok(StoredRecord {
                        id: row.get(0)?,
                        link: row.get(1)?,
                        content: row.get(2)?,
                        images: from_json_array(row.get(3)?),
                        tags: from_json_array(row.get(4)?),
                        dt_download: row.get(5)?,
                        local_path: row.get(6)?,
                        parent_document: row.get(7)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    fn count_records(&self, table: &str) -> StorageResult<u64> {
        let table = checked_table(table)?;
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    fn count_extracted(&self, table: &str) -> StorageResult<u64> {
        let table = checked_table(table)?;
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE parent_document IS NOT NULL",
                table
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    fn create_run(&mut self, company: &str, config_hash: Option<&str>) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO crawl_runs (company, started_at, config_hash, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![company, now(), config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let run = self
            .conn
            .query_row(
                "SELECT id, company, started_at, finished_at, config_hash, status, summary
                 FROM crawl_runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?;

        run.ok_or(StorageError::RunNotFound(run_id))
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StorageResult<()> {
        let summary = serde_json::to_string(summary)?;
        let updated = self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2, summary = ?3 WHERE id = ?4",
            params![status.to_db_string(), now(), summary, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn recent_runs(&self, company: Option<&str>, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, company, started_at, finished_at, config_hash, status, summary
             FROM crawl_runs
             WHERE ?1 IS NULL OR company = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;

        let runs = stmt
            .query_map(params![company, limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }
}

//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::output::RunSummary;
use crate::storage::{
    DocumentRecord, ExtractedFileRecord, PageRecord, RunRecord, RunStatus, StoredRecord,
    UpsertOutcome,
};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Missing parent document {parent} for {url}")]
    MissingParent { url: String, parent: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every write runs in its own transaction and is rolled back on failure, so one
/// failed row never blocks the next.
pub trait Storage {
    // ===== Company Tables =====

    /// Creates the company table if it does not exist yet
    fn ensure_table(&mut self, table: &str) -> StorageResult<()>;

    /// Returns every link stored in the company table
    fn known_urls(&self, table: &str) -> StorageResult<HashSet<String>>;

    /// Returns true if the link is stored in the company table
    fn contains_url(&self, table: &str, url: &str) -> StorageResult<bool>;

    /// Inserts a page or updates the existing row with the same link
    fn upsert_page(&mut self, table: &str, page: &PageRecord) -> StorageResult<UpsertOutcome>;

    /// Inserts a document or updates the existing row with the same link
    fn upsert_document(
        &mut self,
        table: &str,
        document: &DocumentRecord,
    ) -> StorageResult<UpsertOutcome>;

    /// Inserts a file extracted from an archive
    ///
    /// The parent archive row must already exist.
    fn insert_extracted(&mut self, table: &str, file: &ExtractedFileRecord) -> StorageResult<()>;

    /// Gets a stored row by link
    fn get_record(&self, table: &str, url: &str) -> StorageResult<Option<StoredRecord>>;

    /// Counts every row in the company table
    fn count_records(&self, table: &str) -> StorageResult<u64>;

    /// Counts rows extracted from archives
    fn count_extracted(&self, table: &str) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Creates a new crawl run for a company
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, company: &str, config_hash: Option<&str>) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Marks a run as finished and records its summary
    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StorageResult<()>;

    /// Gets the most recent runs, newest first, optionally for one company
    fn recent_runs(&self, company: Option<&str>, limit: usize) -> StorageResult<Vec<RunRecord>>;
}

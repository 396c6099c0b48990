//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and per-company tables
//! - Page, document and extracted-file upserts
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::output::RunSummary;
use crate::CrawlerError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(CrawlerError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CrawlerError> {
    SqliteStorage::new(path)
}

/// A fetched page ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub url: String,
    pub content: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub local_path: Option<String>,
}

/// A downloaded document ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub url: String,
    pub content: String,
    pub tags: Vec<String>,
    pub local_path: String,
    pub file_type: String,
}

/// A file pulled out of a downloaded archive
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFileRecord {
    /// Virtual link: `<parent_url>#extracted/<archive-id>/<path>`
    pub url: String,
    /// Link of the archive this file came from
    pub parent_url: String,
    pub file_name: String,
    /// Path of the entry inside the archive
    pub archive_path: String,
    pub local_path: String,
    pub file_type: String,
    pub size: u64,
    pub tags: Vec<String>,
    pub content: String,
}

/// A row read back from a company table
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: i64,
    pub link: String,
    pub content: Option<String>,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub dt_download: String,
    pub local_path: Option<String>,
    pub parent_document: Option<String>,
}

/// Whether an upsert created a row or replaced one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub company: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: Option<String>,
    pub status: RunStatus,
    pub summary: Option<RunSummary>,
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

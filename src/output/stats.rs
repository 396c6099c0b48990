//! Run summaries and statistics
//!
//! This module provides the per-run counters returned by every company run and the
//! statistics shown by `--stats`.

use crate::config::CrawlTarget;
use crate::storage::{RunRecord, Storage, StorageResult};
use serde::{Deserialize, Serialize};

/// Counters for one company run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub company: String,

    /// Pages fetched successfully
    pub pages_crawled: usize,

    /// Pages stored for the first time
    pub pages_new: usize,

    /// Pages replaced in forced mode
    pub pages_updated: usize,

    /// Pages fetched but not stored because they were already known
    pub pages_skipped: usize,

    /// Pages that failed to fetch or store
    pub pages_failed: usize,

    /// Document URLs found during the crawl
    pub documents_queued: usize,

    /// Documents downloaded and stored
    pub documents_downloaded: usize,

    /// Documents that failed to download or store
    pub documents_failed: usize,

    /// Documents already stored, not fetched again
    pub documents_skipped: usize,

    /// Files extracted from archives and stored
    pub files_extracted: usize,

    /// Wall-clock duration of the run
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn new(company: &str) -> Self {
        Self {
            company: company.to_string(),
            ..Default::default()
        }
    }

    /// Total failures of any kind
    pub fn failures(&self) -> usize {
        self.pages_failed + self.documents_failed
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== {} ===", summary.company);
    println!(
        "  Pages: {} crawled, {} new, {} updated, {} skipped, {} failed",
        summary.pages_crawled,
        summary.pages_new,
        summary.pages_updated,
        summary.pages_skipped,
        summary.pages_failed
    );
    println!(
        "  Documents: {} queued, {} downloaded, {} skipped, {} failed",
        summary.documents_queued,
        summary.documents_downloaded,
        summary.documents_skipped,
        summary.documents_failed
    );
    println!("  Files extracted from archives: {}", summary.files_extracted);
    println!("  Elapsed: {:.1}s", summary.elapsed_secs);
    println!();
}

/// Stored statistics for one company
#[derive(Debug, Clone)]
pub struct CompanyStatistics {
    pub company: String,
    pub table: String,
    pub total_records: u64,
    pub extracted_records: u64,
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics for a company from storage
pub fn load_statistics<S>(storage: &S, target: &CrawlTarget) -> StorageResult<CompanyStatistics>
where
    S: Storage + ?Sized,
{
    Ok(CompanyStatistics {
        company: target.key.clone(),
        table: target.table.clone(),
        total_records: storage.count_records(&target.table)?,
        extracted_records: storage.count_extracted(&target.table)?,
        recent_runs: storage.recent_runs(Some(&target.key), 5)?,
    })
}

/// Prints company statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CompanyStatistics) {
    println!("=== {} ({}) ===", stats.company, stats.table);
    println!("  Stored rows: {}", stats.total_records);
    println!("  Extracted from archives: {}", stats.extracted_records);

    if stats.recent_runs.is_empty() {
        println!("  No runs recorded");
    } else {
        println!("  Recent runs:");
        for run in &stats.recent_runs {
            let finished = run.finished_at.as_deref().unwrap_or("-");
            match &run.summary {
                Some(summary) => println!(
                    "    #{} {} -> {} [{}] pages new {}, documents {}, failures {}",
                    run.id,
                    run.started_at,
                    finished,
                    run.status.to_db_string(),
                    summary.pages_new,
                    summary.documents_downloaded,
                    summary.failures()
                ),
                None => println!(
                    "    #{} {} -> {} [{}]",
                    run.id,
                    run.started_at,
                    finished,
                    run.status.to_db_string()
                ),
            }
        }
    }
    println!();
}

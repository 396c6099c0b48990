//! Cross-run URL deduplication
//!
//! The known-URL set is the union of the company table (authoritative) and two
//! flat cache files per company, one for pages and one for documents. The files
//! are rewritten wholesale at the end of a run.

mod cache_file;

pub use cache_file::{read_url_file, write_url_file};

use crate::storage::{Storage, StorageResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// URLs processed by earlier runs and by the current one
#[derive(Debug)]
pub struct DedupCache {
    company: String,
    cache_dir: PathBuf,
    force: bool,
    known: HashSet<String>,
    pages: HashSet<String>,
    documents: HashSet<String>,
}

impl DedupCache {
    /// Builds the known-URL set for a company
    ///
    /// Stored links are skipped when `force` is set. The cache files are always
    /// read so that `persist` keeps their entries, but they only count as known
    /// when `use_cache` is set.
    pub fn load<S>(
        company: &str,
        storage: &S,
        table: &str,
        cache_dir: &Path,
        use_cache: bool,
        force: bool,
    ) -> StorageResult<Self>
    where
        S: Storage + ?Sized,
    {
        let mut cache = Self::empty(company, cache_dir, force);

        if !force {
            let stored = storage.known_urls(table)?;
            info!("{} URLs already stored for {}", stored.len(), company);
            cache.known.extend(stored);
        }

        cache.pages = load_or_warn(&cache.pages_path());
        cache.documents = load_or_warn(&cache.documents_path());

        if use_cache {
            info!(
                "Cache for {}: {} pages, {} documents",
                company,
                cache.pages.len(),
                cache.documents.len()
            );
            cache.known.extend(cache.pages.iter().cloned());
            cache.known.extend(cache.documents.iter().cloned());
        } else {
            debug!("URL cache for {} not consulted", company);
        }

        Ok(cache)
    }

    /// Creates a cache that knows nothing yet
    pub fn empty(company: &str, cache_dir: &Path, force: bool) -> Self {
        Self {
            company: company.to_string(),
            cache_dir: cache_dir.to_path_buf(),
            force,
            known: HashSet::new(),
            pages: HashSet::new(),
            documents: HashSet::new(),
        }
    }

    /// Returns true if the URL was processed before and should be skipped
    ///
    /// Always false in forced mode.
    pub fn is_known(&self, url: &str) -> bool {
        !self.force && self.known.contains(url)
    }

    /// Returns true if the run reprocesses everything
    pub fn is_forced(&self) -> bool {
        self.force
    }

    /// Records a processed page
    pub fn mark_page(&mut self, url: &str) {
        self.pages.insert(url.to_string());
        self.known.insert(url.to_string());
    }

    /// Records a processed document
    pub fn mark_document(&mut self, url: &str) {
        self.documents.insert(url.to_string());
        self.known.insert(url.to_string());
    }

    /// Number of URLs currently known
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Path of the processed-pages cache file
    pub fn pages_path(&self) -> PathBuf {
        self.cache_dir
            .join(format!("{}_crawled_urls.txt", self.company))
    }

    /// Path of the processed-documents cache file
    pub fn documents_path(&self) -> PathBuf {
        self.cache_dir
            .join(format!("{}_document_urls.txt", self.company))
    }

    /// Rewrites both cache files with every page and document seen so far
    pub fn persist(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.cache_dir)?;
        write_url_file(&self.pages_path(), &self.pages)?;
        write_url_file(&self.documents_path(), &self.documents)?;
        debug!(
            "Persisted URL cache for {} ({} pages, {} documents)",
            self.company,
            self.pages.len(),
            self.documents.len()
        );
        Ok(())
    }
}

fn load_or_warn(path: &Path) -> HashSet<String> {
    match read_url_file(path) {
        Ok(urls) => urls,
        Err(e) => {
            warn!("Failed to read URL cache {}: {}", path.display(), e);
            HashSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PageRecord, SqliteStorage};
    use tempfile::TempDir;

    const TABLE: &str = "tbl_paginas_test";

    fn storage_with(urls: &[&str]) -> SqliteStorage {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.ensure_table(TABLE).unwrap();
        for url in urls {
            storage
                .upsert_page(
                    TABLE,
                    &PageRecord {
                        url: url.to_string(),
                        content: String::new(),
                        images: Vec::new(),
                        tags: Vec::new(),
                        local_path: None,
                    },
                )
                .unwrap();
        }
        storage
    }

    #[test]
    fn test_stored_urls_are_known() {
        let dir = TempDir::new().unwrap();
        let storage = storage_with(&["https://example.com/a"]);

        let cache = DedupCache::load("test", &storage, TABLE, dir.path(), true, false).unwrap();

        assert!(cache.is_known("https://example.com/a"));
        assert!(!cache.is_known("https://example.com/b"));
    }

    #[test]
    fn test_force_bypasses_everything() {
        let dir = TempDir::new().unwrap();
        let storage = storage_with(&["https://example.com/a"]);

        let mut cache =
            DedupCache::load("test", &storage, TABLE, dir.path(), true, true).unwrap();
        cache.mark_page("https://example.com/b");

        assert!(cache.is_forced());
        assert!(!cache.is_known("https://example.com/a"));
        assert!(!cache.is_known("https://example.com/b"));
    }

    #[test]
    fn test_cache_files_round_trip_across_runs() {
        let dir = TempDir::new().unwrap();
        let storage = storage_with(&[]);

        let mut first = DedupCache::load("test", &storage, TABLE, dir.path(), true, false).unwrap();
        first.mark_page("https://example.com/a");
        first.mark_document("https://example.com/a.pdf");
        first.persist().unwrap();

        let mut second =
            DedupCache::load("test", &storage, TABLE, dir.path(), true, false).unwrap();
        assert!(second.is_known("https://example.com/a"));
        assert!(second.is_known("https://example.com/a.pdf"));

        // Earlier entries survive the rewrite
        second.mark_page("https://example.com/b");
        second.persist().unwrap();
        let pages = read_url_file(&second.pages_path()).unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_no_cache_ignores_files() {
        let dir = TempDir::new().unwrap();
        let storage = storage_with(&[]);

        let mut first = DedupCache::load("test", &storage, TABLE, dir.path(), true, false).unwrap();
        first.mark_page("https://example.com/a");
        first.persist().unwrap();

        let second = DedupCache::load("test", &storage, TABLE, dir.path(), false, false).unwrap();
        assert!(!second.is_known("https://example.com/a"));
    }

    #[test]
    fn test_no_cache_run_keeps_earlier_entries() {
        let dir = TempDir::new().unwrap();
        let storage = storage_with(&[]);

        let mut first = DedupCache::load("test", &storage, TABLE, dir.path(), true, false).unwrap();
        first.mark_page("https://example.com/a");
        first.mark_document("https://example.com/a.pdf");
        first.persist().unwrap();

        let mut uncached =
            DedupCache::load("test", &storage, TABLE, dir.path(), false, false).unwrap();
        uncached.mark_page("https://example.com/b");
        uncached.persist().unwrap();

        let third = DedupCache::load("test", &storage, TABLE, dir.path(), true, false).unwrap();
        assert!(third.is_known("https://example.com/a"));
        assert!(third.is_known("https://example.com/a.pdf"));
        assert!(third.is_known("https://example.com/b"));
    }

    #[test]
    fn test_cache_files_are_per_company() {
        let dir = TempDir::new().unwrap();
        let cache = DedupCache::empty("imbel", dir.path(), false);
        assert!(cache.pages_path().ends_with("imbel_crawled_urls.txt"));
        assert!(cache.documents_path().ends_with("imbel_document_urls.txt"));
    }
}

//! Crawler coordinator - company run orchestration
//!
//! This module drives one company run end to end:
//! - Opening storage and recording the run
//! - Loading the cross-run dedup cache
//! - Crawling pages and persisting the new ones
//! - Downloading queued documents in timed batches
//! - Expanding downloaded archives
//! - Finishing the run with its summary

use crate::archive::ArchiveExpander;
use crate::config::{CrawlTarget, DatabaseSettings, RunOptions};
use crate::crawler::fetcher::{build_http_client, ClientSettings};
use crate::crawler::page::PageFetchResult;
use crate::crawler::parser::ContentFilter;
use crate::crawler::site_crawler::SiteCrawler;
use crate::dedup::DedupCache;
use crate::download::{DownloadOutcome, Downloader};
use crate::output::{
    document_descriptor, page_content, page_html, save_html_content, OutputLayout, RunSummary,
};
use crate::storage::{
    open_storage, DocumentRecord, PageRecord, RunStatus, SqliteStorage, Storage, UpsertOutcome,
};
use crate::url::{derive_tags, document_tags};
use crate::Result;
use futures::future::join_all;
use reqwest::Client;
use std::path::Path;
use std::time::Instant;
use tokio::time::timeout_at;
use tracing::{debug, error, info, warn};

/// Runs one company end to end and returns its summary
pub async fn run_company(
    target: &CrawlTarget,
    options: &RunOptions,
    db: &DatabaseSettings,
) -> Result<RunSummary> {
    let mut coordinator = Coordinator::new(target.clone(), options.clone(), db)?;
    coordinator.run().await
}

/// Owns everything a company run needs
pub struct Coordinator {
    target: CrawlTarget,
    options: RunOptions,
    storage: SqliteStorage,
    layout: OutputLayout,
    client: Client,
    filter: ContentFilter,
}

impl Coordinator {
    /// Creates a coordinator for one company
    ///
    /// Opens the database, creates the company table and the output tree, and
    /// builds the HTTP client. Nothing touches the network yet.
    pub fn new(target: CrawlTarget, options: RunOptions, db: &DatabaseSettings) -> Result<Self> {
        let filter = ContentFilter::for_target(&target)?;

        let mut storage = open_storage(&db.path)?;
        storage.ensure_table(&target.table)?;

        let layout = OutputLayout::new(&options.output_dir, &target.key);
        layout.create()?;

        let client = build_http_client(&ClientSettings::for_target(&target, &options))?;

        Ok(Self {
            target,
            options,
            storage,
            layout,
            client,
            filter,
        })
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Runs the crawl and the document pipeline
    ///
    /// Per-URL failures are counted in the summary; only storage failures while
    /// loading the dedup cache or recording the run end the run with an error.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let started = Instant::now();
        let run_id = self
            .storage
            .create_run(&self.target.key, self.options.targets_hash.as_deref())?;
        info!(
            "Starting run {} for {} at {}",
            run_id, self.target.key, self.target.url
        );

        let mut summary = RunSummary::new(&self.target.key);
        let outcome = self.execute(&mut summary).await;
        summary.elapsed_secs = started.elapsed().as_secs_f64();

        let status = match &outcome {
            Ok(()) => RunStatus::Completed,
            Err(e) => {
                error!("Run {} for {} failed: {}", run_id, self.target.key, e);
                RunStatus::Failed
            }
        };
        if let Err(e) = self.storage.complete_run(run_id, status, &summary) {
            error!("Failed to record the end of run {}: {}", run_id, e);
        }

        info!(
            "Finished {} in {:.1}s: {} new pages, {} documents, {} failures",
            self.target.key,
            summary.elapsed_secs,
            summary.pages_new,
            summary.documents_downloaded,
            summary.failures()
        );

        outcome.map(|()| summary)
    }

    async fn execute(&mut self, summary: &mut RunSummary) -> Result<()> {
        let mut dedup = DedupCache::load(
            &self.target.key,
            &self.storage,
            &self.target.table,
            &self.options.cache_dir,
            self.options.use_cache,
            self.options.force,
        )?;

        let mut crawler = SiteCrawler::new(
            &self.target,
            &self.options,
            self.client.clone(),
            self.filter.clone(),
        )?;

        while let Some(batch) = crawler.next_batch(&dedup).await {
            for page in batch {
                self.persist_page(page, &mut dedup, summary).await;
            }
        }
        info!(
            "Crawled {} pages for {}",
            crawler.pages_fetched(),
            self.target.key
        );

        let documents = crawler.into_documents().into_vec();
        summary.documents_queued = documents.len();
        info!(
            "{} documents queued for {}",
            documents.len(),
            self.target.key
        );

        self.download_documents(&documents, &mut dedup, summary).await;

        if let Err(e) = dedup.persist() {
            warn!("Failed to save URL cache for {}: {}", self.target.key, e);
        }

        Ok(())
    }

    /// Stores a fetched page unless an earlier run already did
    async fn persist_page(
        &mut self,
        page: PageFetchResult,
        dedup: &mut DedupCache,
        summary: &mut RunSummary,
    ) {
        if !page.success {
            summary.pages_failed += 1;
            return;
        }
        summary.pages_crawled += 1;

        if dedup.is_known(&page.url) {
            debug!("Page already stored: {}", page.url);
            summary.pages_skipped += 1;
            return;
        }

        let html = page_html(&page);
        let local_path = match save_html_content(&self.layout.html_dir(), &page.url, &html).await {
            Ok(path) => Some(path.display().to_string()),
            Err(e) => {
                warn!("Failed to save HTML of {}: {}", page.url, e);
                None
            }
        };

        let record = PageRecord {
            url: page.url.clone(),
            content: page_content(&page),
            images: page.image_sources(),
            tags: derive_tags(&page.url),
            local_path,
        };

        match self.storage.upsert_page(&self.target.table, &record) {
            Ok(UpsertOutcome::Inserted) => {
                summary.pages_new += 1;
                dedup.mark_page(&page.url);
            }
            Ok(UpsertOutcome::Updated) => {
                summary.pages_updated += 1;
                dedup.mark_page(&page.url);
            }
            Err(e) => {
                error!("Failed to store page {}: {}", page.url, e);
                summary.pages_failed += 1;
            }
        }
    }

    /// Downloads documents in batches bounded by a shared deadline
    async fn download_documents(
        &mut self,
        urls: &[String],
        dedup: &mut DedupCache,
        summary: &mut RunSummary,
    ) {
        let mut pending = Vec::with_capacity(urls.len());
        for url in urls {
            let stored = !self.options.force
                && match self.storage.contains_url(&self.target.table, url) {
                    Ok(stored) => stored,
                    Err(e) => {
                        warn!("Could not check stored document {}: {}", url, e);
                        false
                    }
                };
            if stored {
                debug!("Document already stored: {}", url);
                summary.documents_skipped += 1;
            } else {
                pending.push(url.clone());
            }
        }

        if pending.is_empty() {
            return;
        }

        let downloader = Downloader::new(
            self.client.clone(),
            self.options.download.clone(),
            self.target.max_connections,
        );
        let expander = ArchiveExpander::new(self.layout.extracted_dir());
        let documents_dir = self.layout.documents_dir();
        let batch_size = self.options.batch_size.max(1);
        let batch_count = pending.len().div_ceil(batch_size);

        for (index, batch) in pending.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.options.batch_pause).await;
            }
            info!(
                "Downloading batch {}/{} for {} ({} documents)",
                index + 1,
                batch_count,
                self.target.key,
                batch.len()
            );

            let deadline = tokio::time::Instant::now() + self.options.batch_timeout();
            let downloads = batch.iter().map(|url| {
                let downloader = &downloader;
                let documents_dir = documents_dir.as_path();
                async move {
                    match timeout_at(deadline, downloader.download(url, documents_dir)).await {
                        Ok(outcome) => outcome,
                        Err(_) => DownloadOutcome::Failed {
                            reason: "batch timed out".to_string(),
                        },
                    }
                }
            });
            let outcomes = join_all(downloads).await;

            for (url, outcome) in batch.iter().zip(outcomes) {
                self.record_document(url, outcome, &expander, dedup, summary)
                    .await;
            }
        }
    }

    /// Stores one download outcome, expanding archives
    async fn record_document(
        &mut self,
        url: &str,
        outcome: DownloadOutcome,
        expander: &ArchiveExpander,
        dedup: &mut DedupCache,
        summary: &mut RunSummary,
    ) {
        let Some(path) = outcome.local_path() else {
            if let DownloadOutcome::Failed { reason } = &outcome {
                error!("Failed to download document {}: {}", url, reason);
            }
            summary.documents_failed += 1;
            return;
        };

        let file_type = outcome.file_type().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let local_path = path.display().to_string();

        let record = DocumentRecord {
            url: url.to_string(),
            content: document_descriptor(&file_name, &file_type, url, &local_path),
            tags: document_tags(url, &file_type),
            local_path,
            file_type,
        };

        if let Err(e) = self.storage.upsert_document(&self.target.table, &record) {
            error!("Failed to store document {}: {}", url, e);
            summary.documents_failed += 1;
            return;
        }
        summary.documents_downloaded += 1;
        dedup.mark_document(url);

        if outcome.is_zip() {
            self.expand_archive(url, path, expander, summary).await;
        }
    }

    async fn expand_archive(
        &mut self,
        url: &str,
        zip_path: &Path,
        expander: &ArchiveExpander,
        summary: &mut RunSummary,
    ) {
        let expander = expander.clone();
        let zip_path = zip_path.to_path_buf();
        let parent_url = url.to_string();

        let records =
            match tokio::task::spawn_blocking(move || expander.expand(&zip_path, &parent_url))
                .await
            {
                Ok(records) => records,
                Err(e) => {
                    error!("Archive expansion of {} panicked: {}", url, e);
                    return;
                }
            };

        for record in &records {
            match self.storage.insert_extracted(&self.target.table, record) {
                Ok(()) => summary.files_extracted += 1,
                Err(e) => warn!(
                    "Failed to store {} extracted from {}: {}",
                    record.archive_path, url, e
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin_targets, DownloadSettings};
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_storage_error_on_lookup_still_downloads() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/balanco.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF".to_vec(), "application/pdf"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut target = builtin_targets().remove(0);
        target.url = format!("{}/", server.uri());
        let options = RunOptions {
            output_dir: dir.path().join("output"),
            cache_dir: dir.path().join("cache"),
            download: DownloadSettings {
                backoff_unit: Duration::from_millis(10),
                ..Default::default()
            },
            ..Default::default()
        };
        let db = DatabaseSettings {
            path: dir.path().join("crawler.db"),
        };
        let mut coordinator = Coordinator::new(target.clone(), options, &db).unwrap();

        // Lookups against the company table now fail
        rusqlite::Connection::open(&db.path)
            .unwrap()
            .execute_batch(&format!("DROP TABLE {}", target.table))
            .unwrap();

        let mut dedup = DedupCache::empty(&target.key, &dir.path().join("cache"), false);
        let mut summary = RunSummary::new(&target.key);
        coordinator
            .download_documents(
                &[format!("{}/balanco.pdf", server.uri())],
                &mut dedup,
                &mut summary,
            )
            .await;

        assert_eq!(summary.documents_skipped, 0);
        assert!(coordinator
            .layout
            .documents_dir()
            .join("balanco.pdf")
            .exists());
    }
}

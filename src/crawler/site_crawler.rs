//! Breadth-first crawl of one company site
//!
//! Pages are fetched level by level in small concurrent batches. Every discovered
//! link passes through the [`NavigationGate`] before it is queued; document links
//! collect in a [`DocumentQueue`] for the downloader.

use crate::config::{CrawlTarget, RunOptions};
use crate::crawler::fetcher::{fetch_page, FetchResult};
use crate::crawler::gate::{DocumentQueue, GateDecision, NavigationGate};
use crate::crawler::page::PageFetchResult;
use crate::crawler::parser::{parse_html, ContentFilter};
use crate::dedup::DedupCache;
use crate::url::{is_document_url, is_same_host, normalize_url};
use crate::UrlError;
use futures::future::join_all;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone)]
struct QueuedPage {
    url: Url,
    depth: u32,
}

/// Crawl state of one company run
///
/// Pull pages with [`SiteCrawler::next_batch`] until it returns `None`, then take
/// the discovered documents with [`SiteCrawler::into_documents`].
pub struct SiteCrawler {
    target: CrawlTarget,
    seed: Url,
    client: Client,
    gate: NavigationGate,
    filter: ContentFilter,
    page_timeout: Duration,
    concurrency: usize,
    frontier: VecDeque<QueuedPage>,
    visited: HashSet<String>,
    fetched: usize,
    documents: DocumentQueue,
}

impl SiteCrawler {
    /// Creates a crawler seeded with the target URL
    ///
    /// The seed is always fetched, even when an earlier run already stored it.
    pub fn new(
        target: &CrawlTarget,
        options: &RunOptions,
        client: Client,
        filter: ContentFilter,
    ) -> Result<Self, UrlError> {
        let seed = normalize_url(&target.url)?;

        let mut visited = HashSet::new();
        visited.insert(seed.to_string());

        let mut frontier = VecDeque::new();
        frontier.push_back(QueuedPage {
            url: seed.clone(),
            depth: 0,
        });

        Ok(Self {
            target: target.clone(),
            seed,
            gate: NavigationGate::new(
                client.clone(),
                options.skip_browser,
                options.download.probe_timeout,
            ),
            client,
            filter,
            page_timeout: options.page_timeout,
            concurrency: target.max_connections.max(1),
            frontier,
            visited,
            fetched: 0,
            documents: DocumentQueue::new(),
        })
    }

    /// Number of pages fetched so far, failures included
    pub fn pages_fetched(&self) -> usize {
        self.fetched
    }

    /// Document URLs discovered so far
    pub fn documents(&self) -> &DocumentQueue {
        &self.documents
    }

    pub fn into_documents(self) -> DocumentQueue {
        self.documents
    }

    /// Fetches the next batch of pages
    ///
    /// Returns `None` once the frontier is empty or the page limit is reached.
    pub async fn next_batch(&mut self, dedup: &DedupCache) -> Option<Vec<PageFetchResult>> {
        let remaining = self.target.max_pages.saturating_sub(self.fetched);
        if remaining == 0 {
            if !self.frontier.is_empty() {
                info!(
                    "Page limit {} reached for {}, {} URLs left unvisited",
                    self.target.max_pages,
                    self.target.key,
                    self.frontier.len()
                );
                self.frontier.clear();
            }
            return None;
        }

        let take = remaining.min(self.concurrency).min(self.frontier.len());
        if take == 0 {
            return None;
        }
        let batch: Vec<QueuedPage> = self.frontier.drain(..take).collect();
        self.fetched += batch.len();

        let fetches = batch
            .iter()
            .map(|queued| fetch_page(&self.client, queued.url.as_str(), self.page_timeout));
        let responses = join_all(fetches).await;

        let mut pages = Vec::with_capacity(batch.len());
        for (queued, response) in batch.into_iter().zip(responses) {
            if let Some(page) = self.handle_response(queued, response, dedup).await {
                pages.push(page);
            }
        }

        Some(pages)
    }

    async fn handle_response(
        &mut self,
        queued: QueuedPage,
        response: FetchResult,
        dedup: &DedupCache,
    ) -> Option<PageFetchResult> {
        let url = queued.url.as_str();

        match response {
            FetchResult::Success {
                final_url,
                status_code,
                body,
                ..
            } => {
                let base = Url::parse(&final_url).unwrap_or_else(|_| queued.url.clone());
                let parsed = parse_html(&body, &base, &self.filter);
                debug!(
                    "Fetched {} (depth {}): {} internal, {} external links",
                    url,
                    queued.depth,
                    parsed.links.internal.len(),
                    parsed.links.external.len()
                );

                let page = PageFetchResult {
                    url: url.to_string(),
                    depth: queued.depth,
                    success: true,
                    error: None,
                    status_code: Some(status_code),
                    html: Some(body),
                    cleaned_html: parsed.cleaned_html,
                    text: parsed.text,
                    title: parsed.title,
                    links: parsed.links,
                    images: parsed.images,
                };

                self.follow_links(&page, dedup).await;
                Some(page)
            }
            FetchResult::ContentMismatch {
                final_url,
                content_type,
            } => {
                info!(
                    "{} is not a page ({}), queueing as document",
                    final_url, content_type
                );
                self.documents.push(url, dedup);
                None
            }
            FetchResult::HttpError { status_code } => {
                error!("Failed to crawl {}: HTTP {}", url, status_code);
                let mut page =
                    PageFetchResult::failed(url, queued.depth, format!("HTTP {}", status_code));
                page.status_code = Some(status_code);
                Some(page)
            }
            FetchResult::NetworkError { error } => {
                error!("Failed to crawl {}: {}", url, error);
                Some(PageFetchResult::failed(url, queued.depth, error))
            }
        }
    }

    /// Routes every link of a fetched page to the frontier or the document queue
    async fn follow_links(&mut self, page: &PageFetchResult, dedup: &DedupCache) {
        let next_depth = page.depth + 1;

        for link in page.links.all() {
            let href = link.href.as_str();
            if self.visited.contains(href) || self.documents.contains(href) {
                continue;
            }

            let Ok(url) = Url::parse(href) else {
                warn!("Skipping unparseable link {}", href);
                continue;
            };

            let navigable = next_depth <= self.target.max_depth
                && (self.target.include_external || is_same_host(&self.seed, &url));

            if !navigable {
                // documents are collected from every link, whatever the crawl scope
                if is_document_url(href) && self.documents.push(href, dedup) {
                    info!("Document found: {}", href);
                }
                continue;
            }

            self.visited.insert(href.to_string());
            match self.gate.check(href, dedup).await {
                GateDecision::Navigate => self.frontier.push_back(QueuedPage {
                    url,
                    depth: next_depth,
                }),
                GateDecision::Document => {
                    if self.documents.push(href, dedup) {
                        info!("Document found: {}", href);
                    }
                }
                GateDecision::Skip => {}
            }
        }
    }
}

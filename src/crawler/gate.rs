//! Pre-navigation filtering of discovered links

use crate::crawler::fetcher::{is_document_content_type, probe_content_type};
use crate::dedup::DedupCache;
use crate::url::{classify, is_definitely_document_url, UrlClass};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// What to do with a discovered link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Fetch it as a page
    Navigate,
    /// Hand it to the downloader
    Document,
    /// Ignore it
    Skip,
}

/// Decides whether a link is crawled, downloaded, or ignored
///
/// Checks run in order and the first match wins:
/// 1. non-http(s) links are skipped
/// 2. the strict document check
/// 3. links processed by an earlier run are skipped
/// 4. a HEAD content-type probe, only when probing is enabled
/// 5. the loose document check
#[derive(Debug, Clone)]
pub struct NavigationGate {
    client: Client,
    probe: bool,
    probe_timeout: Duration,
}

impl NavigationGate {
    pub fn new(client: Client, probe: bool, probe_timeout: Duration) -> Self {
        Self {
            client,
            probe,
            probe_timeout,
        }
    }

    pub async fn check(&self, url: &str, dedup: &DedupCache) -> GateDecision {
        let class = classify(url);
        if class == UrlClass::Rejected {
            return GateDecision::Skip;
        }

        if is_definitely_document_url(url) {
            info!("Not navigating into document: {}", url);
            return GateDecision::Document;
        }

        if dedup.is_known(url) {
            debug!("Already processed: {}", url);
            return GateDecision::Skip;
        }

        if self.probe {
            if let Some(content_type) =
                probe_content_type(&self.client, url, self.probe_timeout).await
            {
                if is_document_content_type(&content_type) {
                    info!(
                        "Not navigating into {} based on Content-Type {}",
                        url, content_type
                    );
                    return GateDecision::Document;
                }
            }
        }

        if class.is_document() {
            debug!("Probable document: {}", url);
            return GateDecision::Document;
        }

        GateDecision::Navigate
    }
}

/// Document URLs waiting for download, in discovery order
#[derive(Debug, Default)]
pub struct DocumentQueue {
    urls: Vec<String>,
    queued: HashSet<String>,
}

impl DocumentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a URL unless it is already queued or was processed before
    ///
    /// Returns true if the URL was added.
    pub fn push(&mut self, url: &str, dedup: &DedupCache) -> bool {
        if self.queued.contains(url) || dedup.is_known(url) {
            return false;
        }
        self.queued.insert(url.to_string());
        self.urls.push(url.to_string());
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.queued.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

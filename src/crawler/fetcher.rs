//! HTTP fetcher implementation
//!
//! This module handles every page request of a company run, including:
//! - Building the shared HTTP client with per-target TLS and pooling policy
//! - GET requests for pages, bounded by a per-page timeout
//! - HEAD probes that reveal document content types
//! - Error classification

use crate::config::{CrawlTarget, RunOptions};
use reqwest::{header, redirect::Policy, Client};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Browser-like user agent; several target servers refuse unknown agents
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Content-type fragments that identify a document rather than a page
const DOCUMENT_CONTENT_TYPES: &[&str] = &[
    "pdf",
    "msword",
    "document",
    "excel",
    "spreadsheet",
    "powerpoint",
    "presentation",
    "zip",
    "compressed",
    "octet-stream",
    "binary",
];

/// Connection policy of one company run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub user_agent: String,

    /// Ceiling for any single request, body included
    pub session_timeout: Duration,

    pub connect_timeout: Duration,

    /// Skip certificate validation
    pub accept_invalid_certs: bool,

    /// Disable connection reuse for servers that drop kept-alive sockets
    pub fragile_server: bool,

    pub max_connections: usize,
}

impl ClientSettings {
    pub fn for_target(target: &CrawlTarget, options: &RunOptions) -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            session_timeout: options.session_timeout,
            connect_timeout: options.connect_timeout,
            accept_invalid_certs: target.ignore_ssl_errors || options.no_ssl_verify,
            fragile_server: target.fragile_server,
            max_connections: target.max_connections,
        }
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
    },

    /// The response is not HTML, so the URL is a document
    ContentMismatch {
        final_url: String,
        content_type: String,
    },

    /// Non-success HTTP status
    HttpError { status_code: u16 },

    /// Network error (connection refused, timeout, etc.)
    NetworkError { error: String },
}

/// Builds the HTTP client shared by the page crawl and the downloader
///
/// # Example
///
/// ```
/// use company_crawler::config::{builtin_targets, RunOptions};
/// use company_crawler::crawler::{build_http_client, ClientSettings};
///
/// let target = &builtin_targets()[0];
/// let settings = ClientSettings::for_target(target, &RunOptions::default());
/// let client = build_http_client(&settings).unwrap();
/// ```
pub fn build_http_client(settings: &ClientSettings) -> Result<Client, reqwest::Error> {
    let idle_per_host = if settings.fragile_server {
        0
    } else {
        settings.max_connections
    };

    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.session_timeout)
        .connect_timeout(settings.connect_timeout)
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        .pool_max_idle_per_host(idle_per_host)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page
///
/// # Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with an HTML or missing Content-Type | Success |
/// | 2xx with any other Content-Type | ContentMismatch |
/// | Other status | HttpError |
/// | Timeout, connection or body error | NetworkError |
pub async fn fetch_page(client: &Client, url: &str, page_timeout: Duration) -> FetchResult {
    match timeout(page_timeout, fetch_inner(client, url)).await {
        Ok(result) => result,
        Err(_) => FetchResult::NetworkError {
            error: format!("page timed out after {}s", page_timeout.as_secs()),
        },
    }
}

async fn fetch_inner(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return FetchResult::NetworkError { error: classify_error(&e) },
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = content_type_of(response.headers());
    if !is_html_content_type(&content_type) {
        return FetchResult::ContentMismatch {
            final_url,
            content_type,
        };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        },
        Err(e) => FetchResult::NetworkError { error: classify_error(&e) },
    }
}

/// Sends a HEAD request and returns the lowercase Content-Type
///
/// Any failure, non-success status or missing header yields `None`.
pub async fn probe_content_type(client: &Client, url: &str, probe_timeout: Duration) -> Option<String> {
    match timeout(probe_timeout, client.head(url).send()).await {
        Ok(Ok(response)) if response.status().is_success() => {
            Some(content_type_of(response.headers())).filter(|ct| !ct.is_empty())
        }
        Ok(Ok(response)) => {
            debug!("HEAD {} returned {}", url, response.status());
            None
        }
        Ok(Err(e)) => {
            debug!("HEAD {} failed: {}", url, e);
            None
        }
        Err(_) => {
            debug!("HEAD {} timed out", url);
            None
        }
    }
}

/// Returns true for HTML content types; a missing header counts as HTML
pub fn is_html_content_type(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}

/// Returns true if the content type names a downloadable document
pub fn is_document_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_lowercase();
    DOCUMENT_CONTENT_TYPES
        .iter()
        .any(|fragment| content_type.contains(fragment))
}

fn content_type_of(headers: &header::HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase()
}

fn classify_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}

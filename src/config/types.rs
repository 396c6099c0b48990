use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Crawl configuration for one company's website
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrawlTarget {
    /// Short company key used on the command line and in cache file names
    pub key: String,

    /// Seed URL of the company's public site
    pub url: String,

    /// Table receiving this company's pages and documents
    pub table: String,

    /// Maximum link depth from the seed URL
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages fetched in one run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Whether links to other hosts are followed
    #[serde(rename = "include-external", default)]
    pub include_external: bool,

    /// Element names stripped from page text
    #[serde(rename = "excluded-tags", default)]
    pub excluded_tags: Vec<String>,

    /// Comma-separated CSS selector stripped from page text
    #[serde(rename = "excluded-selector", default)]
    pub excluded_selector: String,

    /// Accept invalid TLS certificates for this site
    #[serde(rename = "ignore-ssl-errors", default)]
    pub ignore_ssl_errors: bool,

    /// Disable connection reuse for servers that drop keep-alive connections
    #[serde(rename = "fragile-server", default)]
    pub fragile_server: bool,

    /// Maximum number of simultaneous document connections
    #[serde(rename = "max-connections", default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_max_depth() -> u32 {
    10
}

fn default_max_pages() -> usize {
    10_000
}

fn default_max_connections() -> usize {
    10
}

/// Top-level structure of a targets TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TargetsFile {
    #[serde(default, rename = "target")]
    pub targets: Vec<CrawlTarget>,
}

/// Retry and timeout policy for document downloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Attempts per document before giving up
    pub max_retries: u32,

    /// Wall-clock ceiling for a single download attempt
    pub timeout: Duration,

    /// Ceiling for reading a single body chunk
    pub chunk_timeout: Duration,

    /// Ceiling for the HEAD existence probe
    pub probe_timeout: Duration,

    /// Backoff unit; attempt `n` sleeps `2 * n` units before the next attempt
    pub backoff_unit: Duration,

    /// Chunk size used when writing the body to disk
    pub chunk_size: usize,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(60),
            chunk_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
            backoff_unit: Duration::from_secs(1),
            chunk_size: 1024 * 1024,
        }
    }
}

/// Options shared by every company run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Reprocess every URL regardless of previous runs
    pub force: bool,

    /// Probe unclassified links with HEAD before navigating into them
    pub skip_browser: bool,

    /// Accept invalid TLS certificates on every site
    pub no_ssl_verify: bool,

    /// Consult the flat-file URL cache
    pub use_cache: bool,

    /// Root of the per-company output tree
    pub output_dir: PathBuf,

    /// Directory holding the flat-file URL caches
    pub cache_dir: PathBuf,

    /// Document download policy
    pub download: DownloadSettings,

    /// Documents downloaded concurrently in one batch
    pub batch_size: usize,

    /// Pause between document batches
    pub batch_pause: Duration,

    /// Ceiling for any single request on the shared client
    pub session_timeout: Duration,

    /// Ceiling for establishing a connection
    pub connect_timeout: Duration,

    /// Ceiling for fetching one page
    pub page_timeout: Duration,

    /// Hash of the targets file, recorded with every run
    pub targets_hash: Option<String>,
}

impl RunOptions {
    /// Time allowed for a whole document batch before it is abandoned
    pub fn batch_timeout(&self) -> Duration {
        self.download.timeout * 2
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force: false,
            skip_browser: false,
            no_ssl_verify: false,
            use_cache: true,
            output_dir: PathBuf::from("output"),
            cache_dir: PathBuf::from("cache"),
            download: DownloadSettings::default(),
            batch_size: 3,
            batch_pause: Duration::from_millis(500),
            session_timeout: Duration::from_secs(3600),
            connect_timeout: Duration::from_secs(30),
            page_timeout: Duration::from_secs(30),
            targets_hash: None,
        }
    }
}

/// Database connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file
    pub path: PathBuf,
}

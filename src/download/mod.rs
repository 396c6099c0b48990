//! Document download module
//!
//! This module handles fetching document URLs to local files:
//! - Local file names derived from the URL or the response headers
//! - HEAD probing and retries with backoff
//! - Streamed writes with overall and per-chunk timeouts
//! - File type classification

mod downloader;
mod file_kind;
mod filename;

pub use downloader::{DownloadOutcome, Downloader};
pub use file_kind::{file_type_label, FileKind};
pub use filename::{
    clean_filename, derive_filename, guess_extension, parse_content_disposition_filename,
    sanitize_filename, MAX_FILENAME_LEN, PENDING_EXTENSION,
};

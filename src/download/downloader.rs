//! Document downloader
//!
//! Fetches one document URL with a HEAD probe, retries with linear-growth backoff,
//! and streams the body to disk under an overall and a per-chunk timeout.

use crate::config::DownloadSettings;
use crate::download::file_kind::file_type_label;
use crate::download::filename::{
    derive_filename, guess_extension, needs_extension, parse_content_disposition_filename,
    with_extension, MAX_FILENAME_LEN,
};
use crate::url::{normalize_document_url, DOCUMENT_EXTENSIONS};
use reqwest::{header, Client, Response, StatusCode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// Result of downloading one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The body was written to `path`
    Downloaded {
        path: PathBuf,
        file_type: String,
        bytes: u64,
    },

    /// A file with the derived name already existed; nothing was fetched
    AlreadyPresent { path: PathBuf, file_type: String },

    /// Retries exhausted, not found, or not a document
    Failed { reason: String },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Local path of the saved file, `None` on failure
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Downloaded { path, .. } | Self::AlreadyPresent { path, .. } => Some(path),
            Self::Failed { .. } => None,
        }
    }

    /// Best-effort file type, empty on failure
    pub fn file_type(&self) -> &str {
        match self {
            Self::Downloaded { file_type, .. } | Self::AlreadyPresent { file_type, .. } => {
                file_type
            }
            Self::Failed { .. } => "",
        }
    }

    /// Returns true if the saved file is a ZIP archive
    pub fn is_zip(&self) -> bool {
        self.file_type() == "zip"
            || self.local_path().map_or(false, |p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map_or(false, |e| e.eq_ignore_ascii_case("zip"))
            })
    }
}

/// Why a single attempt did not produce a file
#[derive(Debug)]
enum AttemptError {
    /// Give up on this URL
    Abort(String),
    /// Try again after backing off
    Retry(String),
}

/// Statuses that mean the resource will not appear on a retry
fn is_not_found_class(status: StatusCode) -> bool {
    status.is_client_error()
        && status != StatusCode::METHOD_NOT_ALLOWED
        && status != StatusCode::REQUEST_TIMEOUT
        && status != StatusCode::TOO_MANY_REQUESTS
}

/// Statuses a server uses to say it does not implement HEAD
fn is_head_unsupported(status: StatusCode) -> bool {
    status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED
}

/// Downloads documents through a shared client
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    settings: DownloadSettings,
    limiter: Arc<Semaphore>,
}

impl Downloader {
    /// Creates a downloader allowing at most `max_connections` downloads at once
    pub fn new(client: Client, settings: DownloadSettings, max_connections: usize) -> Self {
        Self {
            client,
            settings,
            limiter: Arc::new(Semaphore::new(max_connections.max(1))),
        }
    }

    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    /// Downloads `url` into `target_dir`
    ///
    /// Never returns an error: every failure is reported as [`DownloadOutcome::Failed`].
    pub async fn download(&self, url: &str, target_dir: &Path) -> DownloadOutcome {
        let clean_url = normalize_document_url(url);
        if clean_url.is_empty() {
            error!("Document URL is only a fragment, skipping: {}", url);
            return DownloadOutcome::Failed {
                reason: "empty URL".to_string(),
            };
        }

        let filename = derive_filename(&clean_url);
        let existing = target_dir.join(&filename);
        if existing.exists() {
            debug!("Already on disk, skipping {}: {}", clean_url, existing.display());
            let file_type = file_type_label(&existing, None);
            return DownloadOutcome::AlreadyPresent {
                path: existing,
                file_type,
            };
        }

        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return DownloadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let max_retries = self.settings.max_retries.max(1);
        let mut last_reason = String::from("no attempt made");

        for attempt in 1..=max_retries {
            info!(
                "Downloading {} (attempt {}/{})",
                clean_url, attempt, max_retries
            );

            match self.attempt(&clean_url, target_dir, &filename).await {
                Ok(outcome) => return outcome,
                Err(AttemptError::Abort(reason)) => {
                    error!("Giving up on {}: {}", clean_url, reason);
                    return DownloadOutcome::Failed { reason };
                }
                Err(AttemptError::Retry(reason)) => {
                    error!(
                        "Error downloading {}: {} (attempt {}/{})",
                        clean_url, reason, attempt, max_retries
                    );
                    last_reason = reason;
                    if attempt < max_retries {
                        tokio::time::sleep(self.settings.backoff_unit * 2 * attempt).await;
                    }
                }
            }
        }

        error!(
            "Failed to download {} after {} attempts",
            clean_url, max_retries
        );
        DownloadOutcome::Failed {
            reason: last_reason,
        }
    }

    async fn attempt(
        &self,
        url: &str,
        target_dir: &Path,
        filename: &str,
    ) -> Result<DownloadOutcome, AttemptError> {
        self.probe(url).await?;

        let deadline = Instant::now() + self.settings.timeout;

        let response = match timeout_at(deadline, self.client.get(url).send()).await {
            Err(_) => return Err(AttemptError::Retry("request timed out".to_string())),
            Ok(Err(e)) => return Err(AttemptError::Retry(e.to_string())),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            let reason = format!("status {}", status.as_u16());
            return if is_not_found_class(status) {
                Err(AttemptError::Abort(reason))
            } else {
                Err(AttemptError::Retry(reason))
            };
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .unwrap_or_default();

        let lower_name = filename.to_ascii_lowercase();
        if content_type.contains("text/html")
            && !DOCUMENT_EXTENSIONS.iter().any(|ext| lower_name.contains(ext))
        {
            return Err(AttemptError::Abort(format!(
                "served as {}, not a document",
                content_type
            )));
        }

        let filename = resolve_filename(&response, filename, &content_type);
        let path = target_dir.join(&filename);

        tokio::fs::create_dir_all(target_dir)
            .await
            .map_err(|e| AttemptError::Abort(format!("cannot create {}: {}", target_dir.display(), e)))?;

        info!("Saving {} to {}", url, path.display());
        let bytes = self.stream_to_file(response, &path, deadline, url).await?;

        info!("Download finished: {} ({} bytes)", path.display(), bytes);
        let file_type = file_type_label(
            &path,
            (!content_type.is_empty()).then_some(content_type.as_str()),
        );

        Ok(DownloadOutcome::Downloaded {
            path,
            file_type,
            bytes,
        })
    }

    /// Sends the HEAD probe
    ///
    /// Transport errors and servers without HEAD support fall through to the GET.
    async fn probe(&self, url: &str) -> Result<(), AttemptError> {
        match timeout(self.settings.probe_timeout, self.client.head(url).send()).await {
            Ok(Ok(response)) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() || is_head_unsupported(status) {
                    Ok(())
                } else if is_not_found_class(status) {
                    Err(AttemptError::Abort(format!(
                        "HEAD returned status {}",
                        status.as_u16()
                    )))
                } else {
                    Err(AttemptError::Retry(format!(
                        "HEAD returned status {}",
                        status.as_u16()
                    )))
                }
            }
            Ok(Err(e)) => {
                warn!("HEAD failed for {}: {}, trying GET", url, e);
                Ok(())
            }
            Err(_) => {
                warn!("HEAD timed out for {}, trying GET", url);
                Ok(())
            }
        }
    }

    /// Writes the body to `path` and returns the number of bytes written
    ///
    /// A stalled or broken stream keeps what was received; an empty result is
    /// removed and retried.
    async fn stream_to_file(
        &self,
        mut response: Response,
        path: &Path,
        deadline: Instant,
        url: &str,
    ) -> Result<u64, AttemptError> {
        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| AttemptError::Abort(format!("cannot create {}: {}", path.display(), e)))?;
        let mut writer = BufWriter::with_capacity(self.settings.chunk_size.max(1), file);

        let mut written: u64 = 0;
        let mut interrupted: Option<String> = None;

        loop {
            let now = Instant::now();
            if now >= deadline {
                interrupted = Some("download timed out".to_string());
                break;
            }
            let wait = self.settings.chunk_timeout.min(deadline - now);

            match timeout(wait, response.chunk()).await {
                Ok(Ok(Some(chunk))) => {
                    if let Err(e) = writer.write_all(&chunk).await {
                        interrupted = Some(e.to_string());
                        break;
                    }
                    written += chunk.len() as u64;
                }
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    interrupted = Some(e.to_string());
                    break;
                }
                Err(_) => {
                    interrupted = Some("timed out reading chunk".to_string());
                    break;
                }
            }
        }

        if let Err(e) = writer.flush().await {
            interrupted.get_or_insert(e.to_string());
        }
        drop(writer);

        if let Some(reason) = &interrupted {
            if written > 0 {
                warn!(
                    "Partial download of {} kept at {} ({} bytes): {}",
                    url,
                    path.display(),
                    written,
                    reason
                );
            }
        }

        let on_disk = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 || on_disk == 0 {
            if let Err(e) = tokio::fs::remove_file(path).await {
                debug!("Could not remove empty file {}: {}", path.display(), e);
            }
            return Err(AttemptError::Retry(
                interrupted.unwrap_or_else(|| "empty response body".to_string()),
            ));
        }

        Ok(on_disk)
    }
}

/// Picks the final file name from the response headers
fn resolve_filename(response: &Response, derived: &str, content_type: &str) -> String {
    let mut filename = derived.to_string();

    if let Some(name) = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_disposition_filename)
    {
        if name.chars().count() < MAX_FILENAME_LEN {
            filename = name;
        }
    }

    if needs_extension(&filename) && !content_type.is_empty() {
        filename = with_extension(&filename, &guess_extension(content_type));
    }

    filename
}

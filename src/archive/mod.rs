//! ZIP archive expansion
//!
//! Every non-empty file entry of a downloaded archive is copied under a per-archive
//! directory and described as an [`ExtractedFileRecord`] pointing back at the
//! archive's own URL.

use crate::download::FileKind;
use crate::output::extracted_descriptor;
use crate::storage::ExtractedFileRecord;
use crate::url::{derive_tags, push_tag};
use crate::CrawlerError;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Tag added to every archive and every file pulled out of one
pub const ARCHIVE_TAG: &str = "archive";

/// Tag added to every file pulled out of an archive
pub const EXTRACTED_TAG: &str = "extracted_from_zip";

/// Expands archives under a company's extraction directory
#[derive(Debug, Clone)]
pub struct ArchiveExpander {
    extracted_root: PathBuf,
}

impl ArchiveExpander {
    pub fn new(extracted_root: impl Into<PathBuf>) -> Self {
        Self {
            extracted_root: extracted_root.into(),
        }
    }

    pub fn extracted_root(&self) -> &Path {
        &self.extracted_root
    }

    /// Extracts `zip_path` and describes every extracted file
    ///
    /// A malformed archive yields an empty list. Entries that fail individually are
    /// skipped with a warning.
    pub fn expand(&self, zip_path: &Path, parent_url: &str) -> Vec<ExtractedFileRecord> {
        match self.try_expand(zip_path, parent_url) {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to expand archive {}: {}", zip_path.display(), e);
                Vec::new()
            }
        }
    }

    fn try_expand(
        &self,
        zip_path: &Path,
        parent_url: &str,
    ) -> Result<Vec<ExtractedFileRecord>, CrawlerError> {
        let archive_error = |message: String| CrawlerError::Archive {
            path: zip_path.display().to_string(),
            message,
        };

        let file = File::open(zip_path)?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| archive_error(format!("zip open failed: {e}")))?;

        let archive_id = Uuid::new_v4().to_string();
        let stem = zip_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("archive");
        let destination = self
            .extracted_root
            .join(format!("{}_{}", stem, &archive_id[..8]));
        fs::create_dir_all(&destination)?;

        info!(
            "Extracting {} ({} entries) to {}",
            zip_path.display(),
            archive.len(),
            destination.display()
        );

        let mut base_tags = derive_tags(parent_url);
        push_tag(&mut base_tags, ARCHIVE_TAG);

        let mut records = Vec::new();

        for i in 0..archive.len() {
            let mut entry = match archive.by_index(i) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping entry {} of {}: {}", i, zip_path.display(), e);
                    continue;
                }
            };

            if entry.is_dir() || entry.size() == 0 {
                continue;
            }

            let Some(relative) = entry.enclosed_name() else {
                warn!(
                    "Skipping unsafe entry {} in {}",
                    entry.name(),
                    zip_path.display()
                );
                continue;
            };

            let out_path = destination.join(&relative);
            let size = match copy_entry(&mut entry, &out_path) {
                Ok(size) => size,
                Err(e) => {
                    warn!(
                        "Failed to extract {} from {}: {}",
                        relative.display(),
                        zip_path.display(),
                        e
                    );
                    continue;
                }
            };

            let archive_path = relative.to_string_lossy().replace('\\', "/");
            let file_name = relative
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| archive_path.clone());
            let kind = FileKind::from_path(&relative);

            let mut tags = base_tags.clone();
            push_tag(&mut tags, EXTRACTED_TAG);
            push_tag(&mut tags, kind.as_str());

            let local_path = out_path.display().to_string();
            let content = extracted_descriptor(
                &file_name,
                kind.as_str(),
                parent_url,
                &archive_path,
                &local_path,
                size,
            );

            records.push(ExtractedFileRecord {
                url: format!("{}#extracted/{}/{}", parent_url, archive_id, archive_path),
                parent_url: parent_url.to_string(),
                file_name,
                archive_path,
                local_path,
                file_type: kind.as_str().to_string(),
                size,
                tags,
                content,
            });
        }

        info!(
            "Extracted {} files from {}",
            records.len(),
            zip_path.display()
        );
        Ok(records)
    }
}

fn copy_entry<R: io::Read>(entry: &mut R, out_path: &Path) -> io::Result<u64> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(out_path)?;
    io::copy(entry, &mut out)
}

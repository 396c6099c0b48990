use std::io;
use std::path::{Path, PathBuf};

/// Per-company output tree
///
/// ```text
/// <output>/<company>/html/
/// <output>/<company>/documents/
/// <output>/<company>/extracted/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    company_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(output_dir: &Path, company: &str) -> Self {
        Self {
            company_dir: output_dir.join(company),
        }
    }

    pub fn company_dir(&self) -> &Path {
        &self.company_dir
    }

    /// Raw page HTML
    pub fn html_dir(&self) -> PathBuf {
        self.company_dir.join("html")
    }

    /// Downloaded documents
    pub fn documents_dir(&self) -> PathBuf {
        self.company_dir.join("documents")
    }

    /// Archive contents, one subdirectory per expanded archive
    pub fn extracted_dir(&self) -> PathBuf {
        self.company_dir.join("extracted")
    }

    /// Creates every directory of the tree
    pub fn create(&self) -> io::Result<()> {
        for dir in [self.html_dir(), self.documents_dir(), self.extracted_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

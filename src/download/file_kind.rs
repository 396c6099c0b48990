use std::path::Path;

/// Broad category of a downloaded or extracted file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Pdf,
    Word,
    Excel,
    PowerPoint,
    Csv,
    Archive,
    Image,
    Video,
    Audio,
    Text,
    Html,
    Document,
}

impl FileKind {
    /// Categorizes a file by its extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        Self::from_extension(&ext)
    }

    /// Categorizes a file by a bare extension, without the leading dot
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "doc" | "docx" => Self::Word,
            "xls" | "xlsx" => Self::Excel,
            "ppt" | "pptx" => Self::PowerPoint,
            "csv" => Self::Csv,
            "zip" | "rar" | "7z" | "gz" | "tar" | "bz2" | "xz" => Self::Archive,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" => Self::Image,
            "mp4" | "avi" | "mov" | "wmv" | "flv" | "webm" => Self::Video,
            "mp3" | "wav" | "ogg" | "flac" | "aac" => Self::Audio,
            "txt" => Self::Text,
            "html" | "htm" => Self::Html,
            _ => Self::Document,
        }
    }

    /// Categorizes a file by its declared MIME type
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type.to_ascii_lowercase();

        if ct.contains("pdf") {
            Self::Pdf
        } else if ct.contains("excel") || ct.contains("spreadsheet") {
            Self::Excel
        } else if ct.contains("word") {
            Self::Word
        } else if ct.contains("csv") {
            Self::Csv
        } else if ct.contains("powerpoint") || ct.contains("presentation") {
            Self::PowerPoint
        } else if ct.contains("zip") || ct.contains("compressed") {
            Self::Archive
        } else if ct.starts_with("image/") {
            Self::Image
        } else if ct.starts_with("video/") {
            Self::Video
        } else if ct.starts_with("audio/") {
            Self::Audio
        } else if ct.contains("html") {
            Self::Html
        } else if ct.starts_with("text/plain") {
            Self::Text
        } else {
            Self::Document
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "word",
            Self::Excel => "excel",
            Self::PowerPoint => "powerpoint",
            Self::Csv => "csv",
            Self::Archive => "archive",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
            Self::Html => "html",
            Self::Document => "document",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort type label for a saved file
///
/// The lowercase extension when there is a meaningful one, otherwise the category
/// of the declared content type.
pub fn file_type_label(path: &Path, content_type: Option<&str>) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e != "bin");

    match (ext, content_type) {
        (Some(ext), _) => ext,
        (None, Some(ct)) => FileKind::from_content_type(ct).as_str().to_string(),
        (None, None) => FileKind::Document.as_str().to_string(),
    }
}

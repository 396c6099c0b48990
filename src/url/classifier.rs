use tracing::debug;
use url::Url;

/// File extensions that always mark a URL as a document
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    ".pdf", ".docx", ".doc", ".xlsx", ".xls", ".pptx", ".ppt", ".csv", ".zip", ".rar", ".7z",
    ".gz", ".tar", ".bz2", ".xz", ".odt", ".ods", ".odp", ".txt", ".rtf", ".epub", ".mobi",
    ".pub", ".vsd", ".msg", ".xml", ".json", ".jpg", ".jpeg", ".png", ".gif", ".mp3", ".mp4",
    ".wav",
];

/// Extensions of server-rendered web pages
pub const WEB_PAGE_EXTENSIONS: &[&str] = &[".html", ".htm", ".php", ".asp", ".aspx", ".jsp"];

/// Directory fragments that suggest a download location
const DOCUMENT_DIRECTORIES: &[&str] = &[
    "/storage/",
    "/download/",
    "/arquivos/",
    "/documentos/",
    "/files/",
    "/attachments/",
    "/anexos/",
];

/// Query keys that suggest a download
const DOCUMENT_QUERY_KEYS: &[&str] = &[
    "download=",
    "file=",
    "attachment=",
    "document=",
    "arquivo=",
];

/// Path keywords that suggest a download
const DOCUMENT_KEYWORDS: &[&str] = &[
    "download",
    "document",
    "file",
    "arquivo",
    "edital",
    "formulario",
    "anexo",
];

/// Directory fragments accepted by the strict check
const STRICT_DOCUMENT_DIRECTORIES: &[&str] = &[
    "/download/",
    "/files/",
    "/docs/",
    "/documents/",
    "/documentos/",
    "/arquivos/",
    "/anexos/",
    "/storage/",
];

/// Query keys accepted by the strict check
const STRICT_DOCUMENT_QUERY_KEYS: &[&str] = &[
    "download=",
    "file=",
    "doc=",
    "document=",
    "attachment=",
    "filename=",
];

/// What a URL refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlClass {
    /// Navigable HTML page whose links are followed
    Page,
    /// Downloadable asset, fetched once and never navigated into
    Document,
    /// Not an http(s) URL; dropped
    Rejected,
}

impl UrlClass {
    /// Returns true if the URL should be downloaded
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document)
    }

    /// Returns true if the URL may be crawled as a page
    pub fn is_page(&self) -> bool {
        matches!(self, Self::Page)
    }
}

/// Classifies a URL as a page or a document
///
/// The first matching rule wins:
/// 1. non-http(s) URLs are rejected
/// 2. a document extension at the end of the path
/// 3. a download directory in the path, unless the path ends in a web-page extension
/// 4. a download-indicating query key
/// 5. a download-indicating keyword anywhere in the path, with the same
///    web-page extension exception as rule 3
///
/// Anything else, including URLs that fail to parse, is a page.
///
/// # Examples
///
/// ```
/// use company_crawler::url::{classify, UrlClass};
///
/// assert_eq!(classify("https://example.com/report.pdf"), UrlClass::Document);
/// assert_eq!(classify("https://example.com/files/index.html"), UrlClass::Page);
/// assert_eq!(classify("mailto:someone@example.com"), UrlClass::Rejected);
/// ```
pub fn classify(url: &str) -> UrlClass {
    if !has_http_scheme(url) {
        return UrlClass::Rejected;
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Treating unparseable URL {} as a page: {}", url, e);
            return UrlClass::Page;
        }
    };

    let path = parsed.path().to_lowercase();
    let query = parsed.query().unwrap_or("").to_lowercase();

    if ends_with_any(&path, DOCUMENT_EXTENSIONS) {
        return UrlClass::Document;
    }

    let web_page = ends_with_any(&path, WEB_PAGE_EXTENSIONS);

    if contains_any(&path, DOCUMENT_DIRECTORIES) && !web_page {
        return UrlClass::Document;
    }

    if contains_any(&query, DOCUMENT_QUERY_KEYS) {
        return UrlClass::Document;
    }

    // The directory names double as keywords, so page extensions guard this too
    if contains_any(&path, DOCUMENT_KEYWORDS) && !web_page {
        return UrlClass::Document;
    }

    UrlClass::Page
}

/// Loose check: returns true if the URL probably references a document
pub fn is_document_url(url: &str) -> bool {
    classify(url).is_document()
}

/// Strict check: returns true only if the URL certainly references a document
///
/// Used to keep the page crawl from navigating into files. Requires a document
/// extension, or a download directory together with an extension token in the
/// path, or one of a narrower set of query keys. Keywords alone never match.
pub fn is_definitely_document_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Error checking document URL {}: {}", url, e);
            return false;
        }
    };

    let path = parsed.path().to_lowercase();

    if ends_with_any(&path, DOCUMENT_EXTENSIONS) {
        return true;
    }

    if contains_any(&path, STRICT_DOCUMENT_DIRECTORIES)
        && DOCUMENT_EXTENSIONS
            .iter()
            .any(|ext| path.contains(ext.trim_start_matches('.')))
    {
        return true;
    }

    let query = parsed.query().unwrap_or("").to_lowercase();
    contains_any(&query, STRICT_DOCUMENT_QUERY_KEYS)
}

/// Returns true if the path ends with a known document extension
pub fn has_document_extension(path: &str) -> bool {
    ends_with_any(&path.to_lowercase(), DOCUMENT_EXTENSIONS)
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn ends_with_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.ends_with(n))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

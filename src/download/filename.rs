//! Local file names for downloaded documents

use std::path::Path;
use url::Url;

/// Longest file name taken verbatim from a URL or header
pub const MAX_FILENAME_LEN: usize = 100;

/// Extension used until the content type is known
pub const PENDING_EXTENSION: &str = ".bin";

/// MIME types the target sites serve, mapped to their usual extension
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", ".pdf"),
    ("application/msword", ".doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    ("application/vnd.ms-excel", ".xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
    ("application/vnd.ms-powerpoint", ".ppt"),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".pptx",
    ),
    ("text/csv", ".csv"),
    ("application/zip", ".zip"),
    ("application/x-rar-compressed", ".rar"),
    ("application/x-7z-compressed", ".7z"),
    ("application/gzip", ".gz"),
    ("application/x-tar", ".tar"),
    ("application/x-bzip2", ".bz2"),
    ("application/x-xz", ".xz"),
    ("application/vnd.ms-outlook", ".msg"),
    ("application/xml", ".xml"),
    ("application/json", ".json"),
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
];

/// Replaces characters that are illegal in file names
pub fn clean_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Turns a whole URL into a file-name stem
///
/// Drops the scheme and a leading `www.`, replaces separators and dots with `_`,
/// and keeps at most [`MAX_FILENAME_LEN`] characters.
///
/// # Examples
///
/// ```
/// use company_crawler::download::sanitize_filename;
///
/// assert_eq!(
///     sanitize_filename("https://www.example.com/a/b?x=1"),
///     "example_com_a_b_x=1"
/// );
/// ```
pub fn sanitize_filename(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    let mut rest = url;
    for prefix in ["https://", "http://"] {
        if lower.starts_with(prefix) {
            rest = &url[prefix.len()..];
            break;
        }
    }
    if rest.to_ascii_lowercase().starts_with("www.") {
        rest = &rest[4..];
    }

    clean_filename(rest)
        .chars()
        .map(|c| if c == '.' { '_' } else { c })
        .take(MAX_FILENAME_LEN)
        .collect()
}

/// Derives the local file name for a document URL
///
/// The last path segment is used when it is present and short enough. Otherwise
/// the whole URL is sanitized and the original extension is appended when one can
/// be recovered, or [`PENDING_EXTENSION`] until the content type is known.
pub fn derive_filename(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();

    let basename = path.rsplit('/').next().unwrap_or("");
    let basename = urlencoding::decode(basename)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| basename.to_string());

    if !basename.is_empty() && basename.chars().count() < MAX_FILENAME_LEN {
        return clean_filename(&basename);
    }

    let stem = sanitize_filename(url);
    let extension = Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() < 9)
        .map(|e| format!(".{}", e))
        .unwrap_or_else(|| PENDING_EXTENSION.to_string());

    format!("{}{}", stem, extension)
}

/// Extracts the file name from a Content-Disposition header
///
/// `filename*=` (RFC 5987) wins over `filename=`. Directory components are dropped.
pub fn parse_content_disposition_filename(header: &str) -> Option<String> {
    if let Some(start) = header.find("filename*=") {
        let rest = &header[start + 10..];
        if let Some(quote_start) = rest.find("''") {
            let encoded = rest[quote_start + 2..]
                .split([';', ' '])
                .next()
                .unwrap_or("")
                .trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded) {
                if let Some(name) = final_component(decoded.trim()) {
                    return Some(name);
                }
            }
        }
    }

    if let Some(start) = header.find("filename=") {
        let rest = &header[start + 9..];
        let filename = if let Some(quoted) = rest.strip_prefix('"') {
            quoted.split('"').next()
        } else if let Some(quoted) = rest.strip_prefix('\'') {
            quoted.split('\'').next()
        } else {
            rest.split([';', ' ']).next()
        };

        if let Some(name) = filename.and_then(|n| final_component(n.trim())) {
            return Some(name);
        }
    }

    None
}

fn final_component(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(clean_filename(name))
    }
}

/// Guesses a file extension, with leading dot, from a MIME type
///
/// Known document types first, then the `mime_guess` table, then [`PENDING_EXTENSION`].
pub fn guess_extension(content_type: &str) -> String {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if let Some((_, ext)) = MIME_EXTENSIONS.iter().find(|(m, _)| *m == mime) {
        return ext.to_string();
    }

    if let Some(ext) = mime_guess::get_mime_extensions_str(&mime).and_then(|exts| exts.first()) {
        return format!(".{}", ext);
    }

    PENDING_EXTENSION.to_string()
}

/// Returns true if the name still needs an extension from the content type
pub fn needs_extension(filename: &str) -> bool {
    filename.ends_with(PENDING_EXTENSION) || !filename.contains('.')
}

/// Replaces a pending or missing extension
pub fn with_extension(filename: &str, extension: &str) -> String {
    let stem = match filename.strip_suffix(PENDING_EXTENSION) {
        Some(stem) => stem,
        None => filename,
    };
    format!("{}{}", stem, extension)
}

use crate::url::classifier::DOCUMENT_EXTENSIONS;
use crate::UrlError;
use url::Url;

/// Normalizes a page URL before it is queued or stored
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Only HTTP and HTTPS are accepted
/// 3. A host is required
/// 4. Remove fragment (everything after #)
///
/// Host case and default ports are normalized by the parser itself. Paths and
/// query strings are left alone since the target sites treat them as significant.
///
/// # Examples
///
/// ```
/// use company_crawler::url::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.COM/page#section").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    Ok(url)
}

/// Resolves an href found on a page against the page URL and normalizes it
///
/// Returns `None` for empty hrefs, fragment-only links and non-http(s) schemes.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let joined = base.join(href).ok()?;
    normalize_url(joined.as_str()).ok()
}

/// Cleans a document URL before download
///
/// Drops the fragment and collapses doubled document extensions such as
/// `.pdf.pdf`, which some of the target sites emit.
///
/// # Examples
///
/// ```
/// use company_crawler::url::normalize_document_url;
///
/// assert_eq!(
///     normalize_document_url("https://example.com/a.pdf.pdf#page=2"),
///     "https://example.com/a.pdf"
/// );
/// ```
pub fn normalize_document_url(url: &str) -> String {
    let mut clean = match url.split_once('#') {
        Some((before, _)) => before.to_string(),
        None => url.to_string(),
    };

    for ext in DOCUMENT_EXTENSIONS {
        let doubled = format!("{}{}", ext, ext);
        loop {
            let lower = clean.to_ascii_lowercase();
            match lower.find(&doubled) {
                Some(pos) => clean.replace_range(pos..pos + doubled.len(), ext),
                None => break,
            }
        }
    }

    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_fragment() {
        let url = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keeps_query() {
        let url = normalize_url("https://example.com/index.php?option=com_content&id=3").unwrap();
        assert_eq!(url.query(), Some("option=com_content&id=3"));
    }

    #[test]
    fn test_lowercases_host() {
        let url = normalize_url("https://WWW.Example.COM/Page").unwrap();
        assert_eq!(url.as_str(), "https://www.example.com/Page");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            normalize_url("ftp://example.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(
            normalize_url("mailto:a@example.com"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(normalize_url("not a url"), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_resolve_relative_link() {
        let base = Url::parse("https://example.com/a/b").unwrap();
        assert_eq!(
            resolve_link(&base, "c#x").unwrap().as_str(),
            "https://example.com/a/c"
        );
        assert_eq!(
            resolve_link(&base, "/report.pdf").unwrap().as_str(),
            "https://example.com/report.pdf"
        );
    }

    #[test]
    fn test_resolve_skips_fragments_and_schemes() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(resolve_link(&base, "#top").is_none());
        assert!(resolve_link(&base, "").is_none());
        assert!(resolve_link(&base, "javascript:void(0)").is_none());
        assert!(resolve_link(&base, "mailto:a@example.com").is_none());
    }

    #[test]
    fn test_document_url_collapses_doubled_extension() {
        assert_eq!(
            normalize_document_url("https://example.com/a.pdf.pdf"),
            "https://example.com/a.pdf"
        );
        assert_eq!(
            normalize_document_url("https://example.com/A.PDF.PDF"),
            "https://example.com/A.pdf"
        );
        assert_eq!(
            normalize_document_url("https://example.com/a.docx#p"),
            "https://example.com/a.docx"
        );
    }

    #[test]
    fn test_document_url_untouched() {
        let url = "https://example.com/download?file=1";
        assert_eq!(normalize_document_url(url), url);
    }
}

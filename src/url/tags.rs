//! Tag derivation from URL paths

use crate::url::domain::extract_subdomain;
use url::Url;

/// Splits a URL path into category tags
///
/// Segments containing digits are treated as identifiers of the preceding category
/// and dropped. When no category precedes them, the digits are stripped and any
/// remainder is kept.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use company_crawler::url::extract_path_tags;
///
/// let url = Url::parse("https://example.com/noticias/2024/123").unwrap();
/// assert_eq!(extract_path_tags(&url), vec!["noticias"]);
/// ```
pub fn extract_path_tags(url: &Url) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    for segment in url.path().split('/').filter(|s| !s.is_empty()) {
        let segment = urlencoding::decode(segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| segment.to_string());

        if segment.chars().any(|c| c.is_ascii_digit()) {
            if tags.iter().any(|t| !t.chars().any(|c| c.is_ascii_digit())) {
                continue;
            }

            let remainder: String = segment.chars().filter(|c| !c.is_ascii_digit()).collect();
            let remainder = remainder.trim_matches(|c| matches!(c, ',' | '.' | '-' | '_'));
            if !remainder.is_empty() {
                tags.push(remainder.to_string());
            }
        } else {
            tags.push(segment);
        }
    }

    tags
}

/// Derives the tags stored with a page or document
///
/// Path tags when there are any, otherwise the subdomain label. Unparseable URLs
/// yield no tags.
pub fn derive_tags(url: &str) -> Vec<String> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return Vec::new(),
    };

    let tags = extract_path_tags(&parsed);
    if !tags.is_empty() {
        return tags;
    }

    extract_subdomain(&parsed).into_iter().collect()
}

/// Tags stored with a downloaded document
///
/// The derived URL tags, then the file type, `document`, and `transparencia` when
/// the URL mentions the transparency portal.
pub fn document_tags(url: &str, file_type: &str) -> Vec<String> {
    let mut tags = derive_tags(url);
    push_tag(&mut tags, file_type);
    push_tag(&mut tags, "document");
    if url.to_lowercase().contains("transparencia") {
        push_tag(&mut tags, "transparencia");
    }
    tags
}

/// Appends a tag unless it is empty or already present
pub fn push_tag(tags: &mut Vec<String>, tag: &str) {
    if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}

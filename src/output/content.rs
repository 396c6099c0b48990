//! Markdown content stored in the `content` column

use crate::crawler::PageFetchResult;
use crate::download::sanitize_filename;
use std::fmt::Write;
use std::path::{Path, PathBuf};

const NO_CONTENT: &str = "No content available";

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Builds the content blob for a fetched page
///
/// The body is, in order of preference: the title followed by the page text, the
/// title followed by the cleaned markup in a fenced block, the bare text, or a
/// placeholder. Images and links are appended as their own sections.
pub fn page_content(page: &PageFetchResult) -> String {
    let title = non_empty(&page.title);
    let text = non_empty(&page.text);
    let cleaned = non_empty(&page.cleaned_html);

    let mut content = match (title, text, cleaned) {
        (Some(title), Some(text), _) => format!("# {}\n\n{}", title, text),
        (Some(title), None, Some(cleaned)) => format!("# {}\n\n```html\n{}\n```", title, cleaned),
        (Some(title), None, None) => format!("# {}\n\n", title),
        (None, Some(text), _) => text.to_string(),
        (None, None, _) => NO_CONTENT.to_string(),
    };

    if !page.images.is_empty() {
        content.push_str("\n\n## Images\n\n");
        for image in &page.images {
            let alt = image.alt.as_deref().filter(|a| !a.is_empty()).unwrap_or("Image");
            let _ = write!(content, "![{}]({})\n\n", alt, image.src);
        }
    }

    if !page.links.internal.is_empty() || !page.links.external.is_empty() {
        content.push_str("\n\n## Links\n\n");
        if !page.links.internal.is_empty() {
            content.push_str("### Internal Links\n\n");
            for link in &page.links.internal {
                let _ = writeln!(content, "- [{}]({})", link.label(), link.href);
            }
        }
        if !page.links.external.is_empty() {
            content.push_str("\n### External Links\n\n");
            for link in &page.links.external {
                let _ = writeln!(content, "- [{}]({})", link.label(), link.href);
            }
        }
    }

    content
}

/// Returns the page HTML, or a minimal document built from what was extracted
pub fn page_html(page: &PageFetchResult) -> String {
    if let Some(html) = non_empty(&page.html) {
        return html.to_string();
    }

    let title = non_empty(&page.title).unwrap_or("Untitled");
    let body = match (non_empty(&page.cleaned_html), non_empty(&page.text)) {
        (Some(cleaned), _) => cleaned.to_string(),
        (None, Some(text)) => format!("<pre>{}</pre>", text),
        (None, None) => format!("<p>{}</p>", NO_CONTENT),
    };

    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

/// Writes page HTML under `html_dir`, named after the page URL
pub async fn save_html_content(
    html_dir: &Path,
    url: &str,
    html: &str,
) -> std::io::Result<PathBuf> {
    let mut filename = sanitize_filename(url);
    if !filename.ends_with(".html") {
        filename.push_str(".html");
    }

    tokio::fs::create_dir_all(html_dir).await?;
    let path = html_dir.join(filename);
    tokio::fs::write(&path, html).await?;
    Ok(path)
}

/// Descriptor stored for a downloaded document
pub fn document_descriptor(file_name: &str, file_type: &str, url: &str, local_path: &str) -> String {
    format!(
        "# Document: {}\n\n**Type:** {}\n\n**Source:** {}\n\n**Local file:** {}\n\n",
        file_name, file_type, url, local_path
    )
}

/// Descriptor stored for a file extracted from an archive
pub fn extracted_descriptor(
    file_name: &str,
    file_type: &str,
    parent_url: &str,
    archive_path: &str,
    local_path: &str,
    size: u64,
) -> String {
    let archive_name = parent_url
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or(parent_url);

    format!(
        "# Extracted file: {}\n\n**Type:** {}\n\n**Extracted from:** [{}]({})\n\n\
         **Path in archive:** {}\n\n**Local file:** {}\n\n**Size:** {} bytes\n\n",
        file_name, file_type, archive_name, parent_url, archive_path, local_path, size
    )
}

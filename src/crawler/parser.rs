//! HTML extraction for fetched pages
//!
//! This module turns a page body into:
//! - The page title
//! - Visible text, skipping scripts, styles and the target's excluded elements
//! - Body markup with the same elements removed
//! - Outbound links, split into same-host and other-host
//! - Embedded image references

use crate::config::CrawlTarget;
use crate::crawler::page::{ImageRef, LinkRef, PageLinks};
use crate::url::{is_same_host, resolve_link};
use crate::ConfigError;
use scraper::{Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements never counted as page content
const ALWAYS_EXCLUDED: &[&str] = &["script", "style", "noscript", "template"];

/// Elements removed before text and markup are extracted
#[derive(Debug, Clone)]
pub struct ContentFilter {
    excluded: Vec<Selector>,
}

impl ContentFilter {
    /// Builds a filter from tag names and an optional extra CSS selector
    pub fn new(excluded_tags: &[String], excluded_selector: &str) -> Result<Self, ConfigError> {
        let mut excluded = Vec::new();

        for selector in ALWAYS_EXCLUDED
            .iter()
            .copied()
            .chain(excluded_tags.iter().map(String::as_str))
            .chain(Some(excluded_selector.trim()).filter(|s| !s.is_empty()))
        {
            let parsed = Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
                selector: selector.to_string(),
                message: format!("{:?}", e),
            })?;
            excluded.push(parsed);
        }

        Ok(Self { excluded })
    }

    pub fn for_target(target: &CrawlTarget) -> Result<Self, ConfigError> {
        Self::new(&target.excluded_tags, &target.excluded_selector)
    }
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Visible text, one block per line
    pub text: Option<String>,

    /// Body markup without excluded elements
    pub cleaned_html: Option<String>,

    pub links: PageLinks,

    pub images: Vec<ImageRef>,
}

/// Parses a page body
///
/// # Link Extraction Rules
///
/// - `<a href>` of every element, including `download` links, since those are
///   usually the documents being looked for
/// - relative links are resolved against `page_url`
/// - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only links are dropped
/// - duplicates keep their first occurrence
///
/// # Example
///
/// ```
/// use company_crawler::crawler::{parse_html, ContentFilter};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let filter = ContentFilter::new(&[], "").unwrap();
/// let parsed = parse_html(html, &base_url, &filter);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links.internal[0].href, "https://example.com/page");
/// ```
pub fn parse_html(html: &str, page_url: &Url, filter: &ContentFilter) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        text: None,
        cleaned_html: None,
        links: extract_links(&document, page_url),
        images: extract_images(&document, page_url),
    }
    .with_content(&document, filter)
}

impl ParsedPage {
    fn with_content(mut self, document: &Html, filter: &ContentFilter) -> Self {
        let excluded_elements: Vec<_> = filter
            .excluded
            .iter()
            .flat_map(|selector| document.select(selector))
            .collect();
        let excluded: HashSet<_> = excluded_elements.iter().map(|e| e.id()).collect();

        let body = match Selector::parse("body")
            .ok()
            .and_then(|s| document.select(&s).next())
        {
            Some(body) => body,
            None => document.root_element(),
        };

        let mut blocks = Vec::new();
        for node in body.descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };
            if node.ancestors().any(|a| excluded.contains(&a.id())) {
                continue;
            }
            let block = collapse_whitespace(text);
            if !block.is_empty() {
                blocks.push(block);
            }
        }
        self.text = Some(blocks.join("\n")).filter(|t| !t.is_empty());

        let mut cleaned = body.inner_html();
        for element in &excluded_elements {
            // nested matches disappear with their excluded ancestor
            if element.ancestors().any(|a| excluded.contains(&a.id())) {
                continue;
            }
            cleaned = cleaned.replacen(&element.html(), "", 1);
        }
        let cleaned = cleaned.trim();
        self.cleaned_html = Some(cleaned.to_string()).filter(|c| !c.is_empty());

        self
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Extracts every followable link, split by host
fn extract_links(document: &Html, page_url: &Url) -> PageLinks {
    let mut links = PageLinks::default();
    let mut seen = HashSet::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(absolute) = resolve_link(page_url, href) else {
            continue;
        };
        if !seen.insert(absolute.to_string()) {
            continue;
        }

        let link = LinkRef {
            href: absolute.to_string(),
            text: collapse_whitespace(&element.text().collect::<String>()),
        };

        if is_same_host(page_url, &absolute) {
            links.internal.push(link);
        } else {
            links.external.push(link);
        }
    }

    links
}

/// Extracts `<img src>` references with their alt text
fn extract_images(document: &Html, page_url: &Url) -> Vec<ImageRef> {
    let Ok(img_selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&img_selector)
        .filter_map(|element| {
            let src = resolve_link(page_url, element.value().attr("src")?)?;
            if !seen.insert(src.to_string()) {
                return None;
            }
            let alt = element
                .value()
                .attr("alt")
                .map(collapse_whitespace)
                .filter(|a| !a.is_empty());
            Some(ImageRef {
                src: src.to_string(),
                alt,
            })
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Page fetch results handed from the crawl to persistence

/// An outbound link found on a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkRef {
    /// Absolute URL
    pub href: String,

    /// Anchor text, whitespace-collapsed
    pub text: String,
}

impl LinkRef {
    /// Text to show for the link, falling back to the URL itself
    pub fn label(&self) -> &str {
        if self.text.trim().is_empty() {
            &self.href
        } else {
            &self.text
        }
    }
}

/// Links of a page, split by host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub internal: Vec<LinkRef>,
    pub external: Vec<LinkRef>,
}

impl PageLinks {
    /// Every link, internal first
    pub fn all(&self) -> impl Iterator<Item = &LinkRef> {
        self.internal.iter().chain(self.external.iter())
    }

    pub fn len(&self) -> usize {
        self.internal.len() + self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An embedded image reference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRef {
    /// Absolute image URL
    pub src: String,
    pub alt: Option<String>,
}

/// Everything the crawl learned about one page
///
/// Every extracted field is optional; content rendering falls back through them in
/// a fixed order.
#[derive(Debug, Clone, Default)]
pub struct PageFetchResult {
    /// URL as requested
    pub url: String,

    /// Link distance from the seed
    pub depth: u32,

    pub success: bool,

    /// Failure detail when `success` is false
    pub error: Option<String>,

    pub status_code: Option<u16>,

    /// Raw response body
    pub html: Option<String>,

    /// Body markup with excluded elements removed
    pub cleaned_html: Option<String>,

    /// Visible text with excluded elements removed
    pub text: Option<String>,

    pub title: Option<String>,

    pub links: PageLinks,

    pub images: Vec<ImageRef>,
}

impl PageFetchResult {
    /// A failed fetch
    pub fn failed(url: &str, depth: u32, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            depth,
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Image URLs in page order
    pub fn image_sources(&self) -> Vec<String> {
        self.images.iter().map(|i| i.src.clone()).collect()
    }
}

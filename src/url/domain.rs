use url::{Host, Url};

/// Extracts the domain from a URL
///
/// Returns the lowercase host, or `None` if the URL has no host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use company_crawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the leftmost DNS label when the host has more than two labels
///
/// `www` is treated as no subdomain. IP addresses never yield a subdomain.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use company_crawler::url::extract_subdomain;
///
/// let url = Url::parse("https://transparencia.telebras.com.br/").unwrap();
/// assert_eq!(extract_subdomain(&url), Some("transparencia".to_string()));
///
/// let url = Url::parse("https://www.imbel.gov.br/").unwrap();
/// assert_eq!(extract_subdomain(&url), None);
/// ```
pub fn extract_subdomain(url: &Url) -> Option<String> {
    let domain = match url.host() {
        Some(Host::Domain(domain)) => domain.to_lowercase(),
        _ => return None,
    };

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() <= 2 {
        return None;
    }

    match labels[0] {
        "" | "www" => None,
        label => Some(label.to_string()),
    }
}

/// Returns true if both URLs point at the same host
pub fn is_same_host(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

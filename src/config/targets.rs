//! Built-in crawl targets and target selection

use crate::config::types::CrawlTarget;
use crate::ConfigError;

/// Keyword selecting every configured target
pub const ALL_COMPANIES: &str = "all";

/// Returns the compiled-in crawl targets
pub fn builtin_targets() -> Vec<CrawlTarget> {
    vec![
        CrawlTarget {
            key: "imbel".to_string(),
            url: "https://www.imbel.gov.br/".to_string(),
            table: "tbl_paginas_imbel".to_string(),
            max_depth: 10,
            max_pages: 10_000,
            include_external: false,
            excluded_tags: strings(&[
                "form",
                "header",
                "footer",
                "nav",
                "img-logo-imbel",
                "barra-brasil",
            ]),
            excluded_selector:
                ".blog-anteriores,.cookies-eu-banner,.header-logo-t,.conteudo-barra-brasil"
                    .to_string(),
            ignore_ssl_errors: false,
            fragile_server: false,
            max_connections: 10,
        },
        CrawlTarget {
            key: "ceitec".to_string(),
            url: "http://www.ceitec-sa.com/".to_string(),
            table: "tbl_paginas_ceitec".to_string(),
            max_depth: 10,
            max_pages: 10_000,
            include_external: true,
            excluded_tags: Vec::new(),
            excluded_selector: String::new(),
            ignore_ssl_errors: true,
            fragile_server: true,
            max_connections: 10,
        },
        CrawlTarget {
            key: "telebras".to_string(),
            url: "https://www.telebras.com.br/".to_string(),
            table: "tbl_paginas_telebras".to_string(),
            max_depth: 10,
            max_pages: 10_000,
            include_external: false,
            excluded_tags: strings(&["form", "header", "footer", "nav", "barra-brasil"]),
            excluded_selector:
                ".blog-anteriores,.cookies-eu-banner,.header-logo-t,.conteudo-barra-brasil"
                    .to_string(),
            ignore_ssl_errors: false,
            fragile_server: false,
            max_connections: 10,
        },
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Selects the requested targets by key
///
/// An empty request or the keyword `all` selects every target. Unknown keys are a
/// fatal configuration error. The order of `available` is preserved and duplicates
/// in the request are ignored.
pub fn select_targets(
    available: &[CrawlTarget],
    requested: &[String],
) -> Result<Vec<CrawlTarget>, ConfigError> {
    if requested.is_empty() || requested.iter().any(|r| r == ALL_COMPANIES) {
        return Ok(available.to_vec());
    }

    for key in requested {
        if !available.iter().any(|t| t.key == key.to_lowercase()) {
            return Err(ConfigError::UnknownCompany(key.clone()));
        }
    }

    Ok(available
        .iter()
        .filter(|t| requested.iter().any(|r| r.to_lowercase() == t.key))
        .cloned()
        .collect())
}

//! Crawler module for page fetching and company runs
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and content-type probing
//! - HTML extraction of text, links and images
//! - The navigation gate that keeps documents out of the page crawl
//! - Breadth-first crawling of one site
//! - Overall company run coordination

mod coordinator;
mod fetcher;
mod gate;
mod page;
mod parser;
mod site_crawler;

pub use coordinator::{run_company, Coordinator};
pub use fetcher::{
    build_http_client, fetch_page, is_document_content_type, is_html_content_type,
    probe_content_type, ClientSettings, FetchResult, USER_AGENT,
};
pub use gate::{DocumentQueue, GateDecision, NavigationGate};
pub use page::{ImageRef, LinkRef, PageFetchResult, PageLinks};
pub use parser::{parse_html, ContentFilter, ParsedPage};
pub use site_crawler::SiteCrawler;

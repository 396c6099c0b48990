//! Output module for crawl artifacts and reports
//!
//! This module handles:
//! - The per-company output directory tree
//! - Saving raw page HTML
//! - Markdown content stored with pages, documents and extracted files
//! - Run summaries and statistics

mod content;
mod layout;
pub mod stats;

pub use content::{
    document_descriptor, extracted_descriptor, page_content, page_html, save_html_content,
};
pub use layout::OutputLayout;
pub use stats::{load_statistics, print_statistics, print_summary, CompanyStatistics, RunSummary};

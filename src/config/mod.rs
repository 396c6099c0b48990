//! Configuration module for Company-Crawler
//!
//! Crawl targets are compiled in and may be replaced by a TOML targets file. The
//! database location comes from the environment.
//!
//! # Example
//!
//! ```no_run
//! use company_crawler::config::{builtin_targets, select_targets};
//!
//! let targets = select_targets(&builtin_targets(), &["imbel".to_string()]).unwrap();
//! println!("Crawling {}", targets[0].url);
//! ```

mod env;
mod parser;
mod targets;
mod types;
mod validation;

// Re-export types
pub use types::{CrawlTarget, DatabaseSettings, DownloadSettings, RunOptions, TargetsFile};

pub use env::REQUIRED_ENV_VARS;
pub use parser::{compute_config_hash, load_targets, load_targets_with_hash, parse_targets};
pub use targets::{builtin_targets, select_targets, ALL_COMPANIES};
pub use validation::{validate_run_options, validate_table_name, validate_target, validate_targets};

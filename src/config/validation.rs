use crate::config::types::{CrawlTarget, RunOptions};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates every target and checks that keys and tables are unique
pub fn validate_targets(targets: &[CrawlTarget]) -> Result<(), ConfigError> {
    let mut keys = HashSet::new();
    let mut tables = HashSet::new();

    for target in targets {
        validate_target(target)?;

        if !keys.insert(target.key.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate target key '{}'",
                target.key
            )));
        }
        if !tables.insert(target.table.as_str()) {
            return Err(ConfigError::Validation(format!(
                "table '{}' is used by more than one target",
                target.table
            )));
        }
    }

    Ok(())
}

/// Validates a single crawl target
pub fn validate_target(target: &CrawlTarget) -> Result<(), ConfigError> {
    if target.key.is_empty()
        || !target
            .key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "target key must be lowercase alphanumeric, got '{}'",
            target.key
        )));
    }

    let url = Url::parse(&target.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", target.url, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use http or https",
            target.url
        )));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            target.url
        )));
    }

    validate_table_name(&target.table)?;

    if target.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            target.max_pages
        )));
    }

    if target.max_connections < 1 || target.max_connections > 100 {
        return Err(ConfigError::Validation(format!(
            "max_connections must be between 1 and 100, got {}",
            target.max_connections
        )));
    }

    for tag in &target.excluded_tags {
        validate_selector(tag)?;
    }
    if !target.excluded_selector.trim().is_empty() {
        validate_selector(&target.excluded_selector)?;
    }

    Ok(())
}

/// Validates a table name as a plain SQL identifier
///
/// Table names are interpolated into SQL, so only `[A-Za-z_][A-Za-z0-9_]*` is accepted.
pub fn validate_table_name(table: &str) -> Result<(), ConfigError> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if !valid || table.len() > 63 {
        return Err(ConfigError::Validation(format!(
            "table name '{}' is not a valid identifier",
            table
        )));
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })?;
    Ok(())
}

/// Validates run-wide options assembled from the command line
pub fn validate_run_options(options: &RunOptions) -> Result<(), ConfigError> {
    if options.download.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max_retries must be >= 1".to_string(),
        ));
    }

    if options.download.timeout.is_zero() {
        return Err(ConfigError::Validation(
            "download timeout must be greater than zero".to_string(),
        ));
    }

    if options.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            options.batch_size
        )));
    }

    if options.download.chunk_size < 1 {
        return Err(ConfigError::Validation(
            "chunk_size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::targets::builtin_targets;
    use std::time::Duration;

    #[test]
    fn test_builtin_targets_are_valid() {
        assert!(validate_targets(&builtin_targets()).is_ok());
    }

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("tbl_paginas_imbel").is_ok());
        assert!(validate_table_name("_private").is_ok());

        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("tbl-paginas").is_err());
        assert!(validate_table_name("tbl; DROP TABLE x").is_err());
    }

    #[test]
    fn test_rejects_non_http_seed() {
        let mut target = builtin_targets().remove(0);
        target.url = "ftp://files.example.com/".to_string();
        assert!(matches!(
            validate_target(&target),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_unparseable_seed() {
        let mut target = builtin_targets().remove(0);
        target.url = "not a url".to_string();
        assert!(matches!(
            validate_target(&target),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_rejects_bad_selector() {
        let mut target = builtin_targets().remove(0);
        target.excluded_selector = ".ok,[[broken".to_string();
        assert!(matches!(
            validate_target(&target),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let mut targets = builtin_targets();
        targets[1].key = "imbel".to_string();
        assert!(validate_targets(&targets).is_err());
    }

    #[test]
    fn test_rejects_connection_limit_out_of_range() {
        let mut target = builtin_targets().remove(0);
        target.max_connections = 0;
        assert!(validate_target(&target).is_err());
        target.max_connections = 101;
        assert!(validate_target(&target).is_err());
    }

    #[test]
    fn test_validate_run_options() {
        let mut options = RunOptions::default();
        assert!(validate_run_options(&options).is_ok());

        options.batch_size = 0;
        assert!(validate_run_options(&options).is_err());

        options.batch_size = 3;
        options.download.timeout = Duration::ZERO;
        assert!(validate_run_options(&options).is_err());
    }
}

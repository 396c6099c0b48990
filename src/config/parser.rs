use crate::config::types::{CrawlTarget, TargetsFile};
use crate::config::validation::validate_targets;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and validates a targets file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML targets file
///
/// # Returns
///
/// * `Ok(Vec<CrawlTarget>)` - Successfully loaded and validated targets
/// * `Err(ConfigError)` - Failed to load, parse, or validate the file
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use company_crawler::config::load_targets;
///
/// let targets = load_targets(Path::new("targets.toml")).unwrap();
/// println!("Loaded {} targets", targets.len());
/// ```
pub fn load_targets(path: &Path) -> Result<Vec<CrawlTarget>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_targets(&content)
}

/// Parses and validates targets from TOML text
pub fn parse_targets(content: &str) -> Result<Vec<CrawlTarget>, ConfigError> {
    let file: TargetsFile = toml::from_str(content)?;

    if file.targets.is_empty() {
        return Err(ConfigError::Validation(
            "targets file must define at least one [[target]]".to_string(),
        ));
    }

    validate_targets(&file.targets)?;

    Ok(file.targets)
}

/// Computes a SHA-256 hash of the targets file content
///
/// Recorded with every run so that a change of configuration between runs is visible.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads targets and returns both the targets and the file hash
pub fn load_targets_with_hash(path: &Path) -> Result<(Vec<CrawlTarget>, String), ConfigError> {
    let targets = load_targets(path)?;
    let hash = compute_config_hash(path)?;
    Ok((targets, hash))
}

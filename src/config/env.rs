//! Database settings read from the process environment

use crate::config::types::DatabaseSettings;
use crate::ConfigError;
use std::path::PathBuf;

/// Environment variables that must be present before any crawl starts
pub const REQUIRED_ENV_VARS: &[&str] = &["DB_PATH"];

impl DatabaseSettings {
    /// Reads the settings from the process environment
    ///
    /// A `.env` file is loaded by the binary before this is called.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the settings through an arbitrary lookup function
    ///
    /// Every missing or empty variable is reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<String> = REQUIRED_ENV_VARS
            .iter()
            .filter(|key| lookup(key).map_or(true, |v| v.trim().is_empty()))
            .map(|key| key.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        let path = lookup("DB_PATH").unwrap_or_default();

        Ok(Self {
            path: PathBuf::from(path.trim()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_reads_db_path() {
        let vars: HashMap<&str, &str> = [("DB_PATH", "/var/lib/crawler/pages.db")].into();
        let settings = DatabaseSettings::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.path, PathBuf::from("/var/lib/crawler/pages.db"));
    }

    #[test]
    fn test_missing_variable_is_reported() {
        let result = DatabaseSettings::from_lookup(|_| None);
        match result {
            Err(ConfigError::MissingEnv(missing)) => assert_eq!(missing, vec!["DB_PATH"]),
            other => panic!("expected MissingEnv, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_variable_counts_as_missing() {
        let result = DatabaseSettings::from_lookup(|_| Some("  ".to_string()));
        assert!(matches!(result, Err(ConfigError::MissingEnv(_))));
    }
}

//! Deserializable runtime configuration.
//!
//! Every field has a default, so a partial (or empty) JSON object is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for embedding applications and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute log directory; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub db: DbConfig,
    pub repository: RepositoryConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            db: DbConfig::default(),
            repository: RepositoryConfig::default(),
        }
    }
}

/// Connection pragmas applied on open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            foreign_keys: true,
        }
    }
}

/// Defaults applied to newly constructed repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Start repositories with criteria remembering enabled.
    pub remember_criteria: bool,
    /// Query-string name reported on pages when requests leave it blank.
    pub page_name: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            remember_criteria: false,
            page_name: "page".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, DbConfig};

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: CoreConfig =
            serde_json::from_str(r#"{"db":{"busy_timeout_ms":250},"repository":{"remember_criteria":true}}"#)
                .unwrap();

        assert_eq!(config.db.busy_timeout_ms, 250);
        assert!(config.db.foreign_keys);
        assert!(config.repository.remember_criteria);
        assert_eq!(config.repository.page_name, "page");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn db_defaults_match_bootstrap_expectations() {
        let config = DbConfig::default();
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert!(config.foreign_keys);
    }
}

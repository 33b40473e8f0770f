use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tokenize::TokenizerOptions;

/// What `store()` does with an entity whose project and digests match an
/// existing fact row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Insert another fact row.
    #[default]
    Keep,
    /// Return the existing row's key without writing.
    Skip,
}

/// Top-level namebank configuration, matching `namebank.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamebankConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub tokenizer: TokenizerOptions,
    #[serde(default)]
    pub store: StoreSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub duplicates: DuplicatePolicy,
    /// `SQLite` page cache size in KiB.
    pub cache_size_kib: u32,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            duplicates: DuplicatePolicy::Keep,
            cache_size_kib: 64_000,
        }
    }
}

impl NamebankConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check values that parse but cannot be used for ingestion.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.name.trim().is_empty() {
            return Err(ConfigError::Invalid("project.name must not be empty".into()));
        }
        if self.project.name.contains(' ') {
            return Err(ConfigError::Invalid(format!(
                "project.name must not contain spaces: {:?}",
                self.project.name
            )));
        }
        if self.project.version.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "project.version must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_sections_missing() {
        let config = NamebankConfig::from_toml("").unwrap();
        assert_eq!(config.store.duplicates, DuplicatePolicy::Keep);
        assert_eq!(config.store.cache_size_kib, 64_000);
        assert!(!config.tokenizer.recursive_split);
        assert!(!config.tokenizer.modal_expansion);
        assert!(config.project.name.is_empty());
    }

    #[test]
    fn parses_full_config() {
        let config = NamebankConfig::from_toml(
            r#"
            [project]
            name = "demo"
            version = "1.0"

            [tokenizer]
            recursive_split = true

            [store]
            duplicates = "skip"
            "#,
        )
        .unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.project.version, "1.0");
        assert!(config.tokenizer.recursive_split);
        assert!(!config.tokenizer.modal_expansion);
        assert_eq!(config.store.duplicates, DuplicatePolicy::Skip);
        config.validate().unwrap();
    }

    #[test]
    fn parse_error_is_reported() {
        let err = NamebankConfig::from_toml("[store]\nduplicates = \"merge\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validate_rejects_missing_project() {
        let config = NamebankConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut spaced = NamebankConfig::default();
        spaced.project.name = "my project".into();
        spaced.project.version = "1".into();
        assert!(spaced.validate().is_err());
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NamebankConfig::load(&dir.path().join("namebank.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("namebank.toml");
        std::fs::write(&path, "[project]\nname = \"jhotdraw\"\nversion = \"7.6\"\n").unwrap();
        let config = NamebankConfig::load(&path).unwrap();
        assert_eq!(config.project.name, "jhotdraw");
    }
}

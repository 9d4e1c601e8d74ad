//! Knowledge store configuration.
//!
//! Read from the `knowledge` section of the workspace config file
//! (`.recall/config.yaml`). Every field has a default, so the section and
//! any of its blocks may be omitted.
//!
//! ```yaml
//! knowledge:
//!   embedding:
//!     provider: ollama
//!     model: nomic-embed-text
//!     dimensions: 768
//!   retrieval:
//!     top_k: 3
//!     min_similarity: 0.3
//!     max_chars: 2000
//!   storage:
//!     backend: sqlite
//!     path: blobs.sqlite
//! ```

use crate::embeddings::EmbeddingConfig;
use crate::retrieval::RetrievalConfig;
use recall_core::{AppConfig, AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default blob database file, relative to the state directory.
pub const DEFAULT_BLOB_DB: &str = "blobs.sqlite";

/// Where persisted knowledge bases live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Single-file SQLite database.
    #[default]
    Sqlite,
    /// Process memory; nothing survives a restart.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: PathBuf::from(DEFAULT_BLOB_DB),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    knowledge: Option<KnowledgeConfig>,
}

impl KnowledgeConfig {
    /// Load the `knowledge` section of the application's config file.
    ///
    /// A missing file or section yields the defaults.
    pub fn load(app_config: &AppConfig) -> AppResult<Self> {
        let path = app_config.config_path();
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using default knowledge config", path);
            return Ok(Self::default());
        }

        let config = Self::from_file(&path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the `knowledge` section from a YAML file.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_yaml(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        let file: ConfigFile = serde_yaml::from_str(contents)?;
        Ok(file.knowledge.unwrap_or_default())
    }

    pub fn validate(&self) -> AppResult<()> {
        self.embedding.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }

    /// Absolute location of the blob database.
    ///
    /// Relative paths are resolved against `state_dir`.
    pub fn blob_path(&self, state_dir: &Path) -> PathBuf {
        if self.storage.path.is_absolute() {
            self.storage.path.clone()
        } else {
            state_dir.join(&self.storage.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = KnowledgeConfig::default();
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section() {
        let yaml = "logging:\n  level: info\nknowledge:\n  retrieval:\n    max_chars: 500\n  storage:\n    backend: memory\n";
        let config = KnowledgeConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.retrieval.max_chars, 500);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.embedding, EmbeddingConfig::default());
    }

    #[test]
    fn test_missing_section_is_default() {
        let config = KnowledgeConfig::from_yaml("logging:\n  level: warn\n").unwrap();
        assert_eq!(config, KnowledgeConfig::default());
    }

    #[test]
    fn test_blob_path_resolution() {
        let config = KnowledgeConfig::default();
        assert_eq!(
            config.blob_path(Path::new("/ws/.recall")),
            PathBuf::from("/ws/.recall/blobs.sqlite")
        );

        let absolute = KnowledgeConfig {
            storage: StorageConfig {
                path: PathBuf::from("/data/kb.sqlite"),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            absolute.blob_path(Path::new("/ws/.recall")),
            PathBuf::from("/data/kb.sqlite")
        );
    }

    #[test]
    fn test_load_from_workspace() {
        let temp = TempDir::new().unwrap();
        let app_config = AppConfig::default().with_overrides(
            Some(temp.path().to_path_buf()),
            None,
            None,
            false,
            false,
        );
        app_config.ensure_state_dir().unwrap();

        assert_eq!(
            KnowledgeConfig::load(&app_config).unwrap(),
            KnowledgeConfig::default()
        );

        std::fs::write(
            app_config.config_path(),
            "knowledge:\n  retrieval:\n    top_k: 0\n",
        )
        .unwrap();
        assert!(KnowledgeConfig::load(&app_config).is_err());
    }
}

//! Ingest command handler.
//!
//! Adds one file to a user's knowledge base and persists the result.

use super::{open_registry, print_json};
use clap::Args;
use recall_core::{config::AppConfig, AppError, AppResult};
use recall_knowledge::{Metadata, META_FILENAME, META_SOURCE_ID, META_SOURCE_TYPE};
use std::path::PathBuf;

/// Ingest a text file into a user's knowledge base
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// User identifier
    pub user: String,

    /// File to ingest (UTF-8 text)
    pub file: PathBuf,

    /// Name used for attribution (default: the file's name)
    #[arg(long)]
    pub filename: Option<String>,

    /// Source type recorded in chunk metadata
    #[arg(long, default_value = "text")]
    pub source_type: String,

    /// Extra metadata entries
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub meta: Vec<(String, String)>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for user '{}'", self.user);

        let text = tokio::fs::read_to_string(&self.file).await.map_err(|e| {
            AppError::Config(format!("Failed to read {:?}: {}", self.file, e))
        })?;

        let metadata = self.metadata();
        let registry = open_registry(config)?;

        registry.restore(&self.user).await?;
        let added = registry.ingest(&self.user, &text, &metadata).await?;
        let stats = registry.stats(&self.user).await?;

        // The in-memory ingest stands even if it cannot be saved
        let blob_id = match registry.persist(&self.user).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Failed to persist knowledge base for '{}': {}", self.user, e);
                eprintln!("Warning: knowledge base was not saved: {}", e);
                None
            }
        };

        if self.json {
            print_json(&serde_json::json!({
                "user": self.user,
                "filename": metadata.get(META_FILENAME),
                "chunksAdded": added,
                "totalChunks": stats.chunk_count,
                "blobId": blob_id,
            }))?;
        } else {
            println!(
                "Ingested {} chunks from {} ({} total for '{}')",
                added,
                self.file.display(),
                stats.chunk_count,
                self.user
            );
        }

        Ok(())
    }

    fn metadata(&self) -> Metadata {
        let mut metadata: Metadata = self.meta.iter().cloned().collect();

        let filename = self.filename.clone().or_else(|| {
            self.file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        });
        if let Some(filename) = filename {
            metadata.insert(META_FILENAME.to_string(), filename);
        }

        metadata.insert(META_SOURCE_TYPE.to_string(), self.source_type.clone());
        metadata
            .entry(META_SOURCE_ID.to_string())
            .or_insert_with(|| self.file.display().to_string());

        metadata
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;

    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", s));
    }

    Ok((key.to_string(), value.to_string()))
}

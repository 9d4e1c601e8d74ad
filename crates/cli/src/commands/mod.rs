//! Command handlers for the Recall CLI.

pub mod ask;
pub mod ingest;
pub mod stats;

pub use ask::AskCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;

use recall_core::{config::AppConfig, AppError, AppResult};
use recall_knowledge::{KnowledgeConfig, KnowledgeRegistry};

/// Build the knowledge registry for this workspace.
pub fn open_registry(config: &AppConfig) -> AppResult<KnowledgeRegistry> {
    let knowledge_config = KnowledgeConfig::load(config)?;
    KnowledgeRegistry::from_config(&knowledge_config, &config.state_dir())
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) -> AppResult<()> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
    println!("{}", output);
    Ok(())
}

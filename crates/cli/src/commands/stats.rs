//! Stats command handler.

use super::{open_registry, print_json};
use clap::Args;
use recall_core::{config::AppConfig, AppResult};

/// Show a user's knowledge base statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// User identifier
    pub user: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command for user '{}'", self.user);

        let registry = open_registry(config)?;
        let stats = registry.stats(&self.user).await?;

        if self.json {
            print_json(&serde_json::json!({
                "user": self.user,
                "chunkCount": stats.chunk_count,
                "documentCount": stats.document_count,
                "dimensions": stats.dimensions,
                "indexed": stats.indexed,
            }))?;
        } else {
            println!("Knowledge base for '{}':", self.user);
            println!("  Documents: {}", stats.document_count);
            println!("  Chunks:    {}", stats.chunk_count);
            match stats.dimensions {
                Some(d) => println!("  Dimensions: {}", d),
                None => println!("  Dimensions: (empty)"),
            }
        }

        Ok(())
    }
}

//! Ask command handler.
//!
//! Prints the context a user's documents provide for a query.

use super::{open_registry, print_json};
use clap::Args;
use recall_core::{config::AppConfig, AppResult};

/// Retrieve document context for a query
#[derive(Args, Debug)]
pub struct AskCommand {
    /// User identifier
    pub user: String,

    /// Query text
    pub query: String,

    /// Character budget for the context (default from config)
    #[arg(long)]
    pub max_chars: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command for user '{}'", self.user);
        tracing::debug!("Ask command options: {:?}", self);

        let registry = open_registry(config)?;
        let retrieved = registry
            .retrieve_with_context(&self.user, &self.query, self.max_chars)
            .await?;

        if self.json {
            print_json(&serde_json::json!({
                "user": self.user,
                "query": self.query,
                "context": retrieved.context,
                "results": retrieved.results,
            }))?;
        } else {
            println!("{}", retrieved.context);
        }

        Ok(())
    }
}

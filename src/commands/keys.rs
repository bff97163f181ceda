//! Cache key inspection and deletion commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use console_core::config::AppConfig;
use console_core::error::AppError;

/// Arguments for key commands
#[derive(Debug, Args)]
pub struct KeysArgs {
    /// Key subcommand
    #[command(subcommand)]
    pub command: KeysCommand,
}

/// Key subcommands
#[derive(Debug, Subcommand)]
pub enum KeysCommand {
    /// List live keys
    List {
        /// Only show public keys and keys private to this principal
        #[arg(short, long)]
        principal: Option<String>,
    },
    /// Delete a single key
    Delete {
        /// Key as shown by `keys list`
        key: String,
    },
    /// Delete every key private to a principal
    Purge {
        /// Principal (user) id
        principal: String,
    },
    /// Delete every key owned by the cache
    Flush {
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },
}

/// Execute key commands
pub async fn execute(
    args: &KeysArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let cache = super::connect_cache(config).await?;

    match &args.command {
        KeysCommand::List { principal } => {
            let keys = cache.inspector.list_keys(principal.as_deref()).await?;
            output::print_keys(&keys, format);
        }
        KeysCommand::Delete { key } => match cache.inspector.delete_key(key).await {
            0 => output::warning(&format!("Key '{key}' not found")),
            _ => output::success(&format!("Deleted '{key}'")),
        },
        KeysCommand::Purge { principal } => {
            let count = cache.inspector.delete_private_keys(principal).await;
            output::success(&format!(
                "Deleted {count} key(s) private to '{principal}'"
            ));
        }
        KeysCommand::Flush { yes } => {
            if !yes {
                output::warning("This deletes every cache key. Re-run with --yes to confirm.");
                return Ok(());
            }
            let count = cache.inspector.flush_all().await;
            output::success(&format!("Flushed {count} key(s)"));
        }
    }

    Ok(())
}


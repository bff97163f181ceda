//! CLI command definitions and dispatch.

pub mod config;
pub mod keys;
pub mod status;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use console_cache::CacheLayer;
use console_core::config::AppConfig;
use console_core::error::AppError;

/// Admin console cache operations
#[derive(Debug, Parser)]
#[command(name = "console-cache", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay to merge (defaults to $CONSOLE_ENV or "development")
    #[arg(short, long)]
    pub env: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List, delete or flush cache keys
    Keys(keys::KeysArgs),
    /// Show backend, health and key counts
    Status,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Load the configuration selected on the command line.
    pub fn load_config(&self) -> Result<AppConfig, AppError> {
        let env = self
            .env
            .clone()
            .or_else(|| std::env::var("CONSOLE_ENV").ok())
            .unwrap_or_else(|| "development".to_string());
        AppConfig::load(&self.config, &env)
    }

    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Keys(args) => keys::execute(args, &config, self.format).await,
            Commands::Status => status::execute(&config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, &self.config, self.format),
        }
    }
}

/// Helper: build the cache layer from config
pub async fn connect_cache(config: &AppConfig) -> Result<CacheLayer, AppError> {
    tracing::info!(provider = %config.cache.provider, "Initializing cache");
    CacheLayer::new(&config.cache).await
}

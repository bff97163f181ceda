//! Cache status command.

use crate::output::{self, OutputFormat};
use console_core::config::AppConfig;
use console_core::error::AppError;

/// Execute the status command
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let cache = super::connect_cache(config).await?;
    let status = cache.inspector.status().await?;
    output::print_status(&status, format);
    Ok(())
}

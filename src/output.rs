//! Rendering of key listings, cache status and configuration.
//!
//! Tables are for operators at a terminal; JSON keeps the raw numeric
//! fields for scripts.

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use console_cache::redis::client::mask_redis_url;
use console_cache::{KeyInfo, inspect::CacheStatus};
use console_core::config::AppConfig;
use console_core::config::cache::CacheDuration;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// One row of the key listing.
#[derive(Debug, Tabled)]
struct KeyRow {
    key: String,
    #[tabled(rename = "type")]
    key_type: String,
    size: String,
    ttl: String,
    privacy: &'static str,
    owner: String,
}

impl From<&KeyInfo> for KeyRow {
    fn from(info: &KeyInfo) -> Self {
        Self {
            key: info.key.clone(),
            key_type: info.key_type.clone(),
            size: format!("{} B", info.size_estimate),
            ttl: info
                .ttl_remaining
                .map_or_else(|| "none".to_string(), |t| format!("{t}s")),
            privacy: info.privacy.label(),
            owner: info.privacy.owner().unwrap_or("-").to_string(),
        }
    }
}

/// A labelled value in the status and config views.
#[derive(Debug, Tabled)]
struct Field {
    field: String,
    value: String,
}

impl Field {
    fn new(field: impl Into<String>, value: impl ToString) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
        }
    }
}

/// Print live keys.
pub fn print_keys(keys: &[KeyInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&keys),
        OutputFormat::Table if keys.is_empty() => println!("No live cache keys."),
        OutputFormat::Table => {
            let rows: Vec<KeyRow> = keys.iter().map(KeyRow::from).collect();
            let private = keys.iter().filter(|k| k.privacy.owner().is_some()).count();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{table}");
            println!("{} key(s), {private} private", keys.len());
        }
    }
}

/// Print backend health and key counts.
pub fn print_status(status: &CacheStatus, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(status),
        OutputFormat::Table => {
            print_fields(status_fields(status));
            if !status.healthy {
                warning("Backend did not answer its health check");
            }
        }
    }
}

/// Print the effective configuration with credentials masked.
pub fn print_config(config: &AppConfig, format: OutputFormat) {
    let mut shown = config.clone();
    shown.cache.redis.url = mask_redis_url(&shown.cache.redis.url);
    match format {
        OutputFormat::Json => print_json(&shown),
        OutputFormat::Table => print_fields(config_fields(&shown)),
    }
}

/// Report a completed action.
pub fn success(msg: &str) {
    println!("✓ {msg}");
}

/// Report something the operator should look at.
pub fn warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Report a failed command on stderr.
pub fn error(msg: &str) {
    eprintln!("✗ {msg}");
}

fn status_fields(status: &CacheStatus) -> Vec<Field> {
    vec![
        Field::new("backend", &status.backend),
        Field::new("enabled", status.enabled),
        Field::new("healthy", status.healthy),
        Field::new("keys", status.total_keys),
        Field::new("public", status.public_keys),
        Field::new("private", status.private_keys),
    ]
}

fn config_fields(config: &AppConfig) -> Vec<Field> {
    let cache = &config.cache;
    let mut fields = vec![
        Field::new("cache.enabled", cache.enabled),
        Field::new("cache.provider", &cache.provider),
        Field::new("cache.fallback_to_memory", cache.fallback_to_memory),
        Field::new("cache.coalesce_misses", cache.coalesce_misses),
        Field::new("cache.default_duration", cache.default_duration),
    ];
    fields.extend(CacheDuration::ALL.into_iter().map(|tier| {
        Field::new(
            format!("cache.durations.{tier}"),
            format!("{}s", cache.durations.seconds(tier)),
        )
    }));
    fields.extend([
        Field::new("cache.redis.url", &cache.redis.url),
        Field::new("cache.redis.key_prefix", &cache.redis.key_prefix),
        Field::new("cache.memory.max_capacity", cache.memory.max_capacity),
        Field::new("logging.level", &config.logging.level),
        Field::new("logging.format", &config.logging.format),
    ]);
    fields
}

fn print_fields(fields: Vec<Field>) {
    let table = Table::new(fields).with(Style::rounded()).to_string();
    println!("{table}");
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => error(&format!("Could not encode output: {e}")),
    }
}

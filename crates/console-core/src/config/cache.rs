//! Cache layer configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Top-level cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Master switch. When `false` nothing is cached and every
    /// invalidation is a no-op.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cache provider type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Fall back to the in-memory store when Redis is unreachable at startup.
    #[serde(default = "default_true")]
    pub fallback_to_memory: bool,
    /// Make concurrent misses of the same key share one computation.
    #[serde(default)]
    pub coalesce_misses: bool,
    /// Tier used when a caller does not pick one.
    #[serde(default)]
    pub default_duration: CacheDuration,
    /// TTL in seconds for every duration tier.
    #[serde(default)]
    pub durations: DurationTiers,
    /// Redis-specific cache configuration.
    #[serde(default)]
    pub redis: RedisCacheConfig,
    /// In-memory cache configuration.
    #[serde(default)]
    pub memory: MemoryCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            fallback_to_memory: true,
            coalesce_misses: false,
            default_duration: CacheDuration::default(),
            durations: DurationTiers::default(),
            redis: RedisCacheConfig::default(),
            memory: MemoryCacheConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Check the tier table and the Redis key prefix.
    pub fn validate(&self) -> Result<(), AppError> {
        self.durations.validate()?;
        self.redis.validate()
    }
}

/// Named TTL tier chosen per resource by volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheDuration {
    /// Frequently changing data such as system metrics.
    Short,
    /// Lists and paginated views.
    #[default]
    Medium,
    /// Rarely changing configuration.
    Long,
    /// Near-static reference data.
    Day,
}

impl CacheDuration {
    /// All tiers in ascending order.
    pub const ALL: [CacheDuration; 4] = [Self::Short, Self::Medium, Self::Long, Self::Day];

    /// Configuration name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
            Self::Day => "day",
        }
    }
}

impl fmt::Display for CacheDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheDuration {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            "day" => Ok(Self::Day),
            other => Err(AppError::validation(format!(
                "Unknown cache duration tier: '{other}'. Supported: short, medium, long, day"
            ))),
        }
    }
}

/// Longest accepted tier TTL (one year).
pub const MAX_TTL_SECONDS: u64 = 365 * 86_400;

/// Process-wide mapping from duration tier to TTL seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationTiers {
    /// TTL for [`CacheDuration::Short`].
    #[serde(default = "default_short")]
    pub short: u64,
    /// TTL for [`CacheDuration::Medium`].
    #[serde(default = "default_medium")]
    pub medium: u64,
    /// TTL for [`CacheDuration::Long`].
    #[serde(default = "default_long")]
    pub long: u64,
    /// TTL for [`CacheDuration::Day`].
    #[serde(default = "default_day")]
    pub day: u64,
}

impl Default for DurationTiers {
    fn default() -> Self {
        Self {
            short: default_short(),
            medium: default_medium(),
            long: default_long(),
            day: default_day(),
        }
    }
}

impl DurationTiers {
    /// TTL in seconds for a tier.
    pub fn seconds(&self, tier: CacheDuration) -> u64 {
        match tier {
            CacheDuration::Short => self.short,
            CacheDuration::Medium => self.medium,
            CacheDuration::Long => self.long,
            CacheDuration::Day => self.day,
        }
    }

    /// TTL for a tier.
    pub fn resolve(&self, tier: CacheDuration) -> Duration {
        Duration::from_secs(self.seconds(tier))
    }

    /// Reject zero TTLs, which Redis refuses for `SET ... EX`, and TTLs
    /// above [`MAX_TTL_SECONDS`].
    pub fn validate(&self) -> Result<(), AppError> {
        for tier in CacheDuration::ALL {
            match self.seconds(tier) {
                0 => {
                    return Err(AppError::configuration(format!(
                        "cache.durations.{tier} must be greater than zero"
                    )));
                }
                secs if secs > MAX_TTL_SECONDS => {
                    return Err(AppError::configuration(format!(
                        "cache.durations.{tier} is {secs}s, the maximum is {MAX_TTL_SECONDS}s"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Redis cache backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for all console cache keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// How long to wait for the initial connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// `COUNT` hint passed to each `SCAN` call.
    #[serde(default = "default_scan_count")]
    pub scan_count: u32,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
            connect_timeout_seconds: default_connect_timeout(),
            scan_count: default_scan_count(),
        }
    }
}

impl RedisCacheConfig {
    /// Reject key prefixes that would act as wildcards in `SCAN MATCH`,
    /// letting pattern deletes reach keys this cache does not own.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(c) = self
            .key_prefix
            .chars()
            .find(|c| matches!(c, '*' | '?' | '[' | ']' | '\\'))
        {
            return Err(AppError::configuration(format!(
                "cache.redis.key_prefix '{}' must not contain glob character '{c}'",
                self.key_prefix
            )));
        }
        Ok(())
    }
}

/// In-memory cache backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries in the cache.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Interval of the background expiry sweep; `0` disables it.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_short() -> u64 {
    300
}

fn default_medium() -> u64 {
    1800
}

fn default_long() -> u64 {
    3600
}

fn default_day() -> u64 {
    86400
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "console:".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_scan_count() -> u32 {
    200
}

fn default_max_capacity() -> u64 {
    10000
}

fn default_sweep_interval() -> u64 {
    60
}

//! Cache configuration.
//!
//! Controls which backend stores entries and how long each kind lives.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CAPACITY: usize = 1_000;
const DEFAULT_ARTICLE_TTL_SECONDS: u64 = 300;
const DEFAULT_STATISTICS_TTL_SECONDS: u64 = 900;
const DEFAULT_AUTHOR_COUNT_TTL_SECONDS: u64 = 300;
const DEFAULT_KEY_PREFIX: &str = "content-hub";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    /// In-process LRU.
    #[default]
    Memory,
    Redis,
}

impl std::str::FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown cache backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackendKind,
    pub redis_url: Option<String>,
    /// Namespace prepended to every key written to a shared backend.
    pub key_prefix: String,
    /// Maximum entries held by the in-process backend.
    pub capacity: usize,
    pub article_ttl_seconds: u64,
    pub statistics_ttl_seconds: u64,
    pub author_count_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Memory,
            redis_url: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            capacity: DEFAULT_CAPACITY,
            article_ttl_seconds: DEFAULT_ARTICLE_TTL_SECONDS,
            statistics_ttl_seconds: DEFAULT_STATISTICS_TTL_SECONDS,
            author_count_ttl_seconds: DEFAULT_AUTHOR_COUNT_TTL_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            key_prefix: settings.key_prefix.clone(),
            capacity: settings.capacity,
            article_ttl_seconds: settings.article_ttl_seconds,
            statistics_ttl_seconds: settings.statistics_ttl_seconds,
            author_count_ttl_seconds: settings.author_count_ttl_seconds,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn article_ttl(&self) -> Duration {
        Duration::from_secs(self.article_ttl_seconds)
    }

    pub fn statistics_ttl(&self) -> Duration {
        Duration::from_secs(self.statistics_ttl_seconds)
    }

    pub fn author_count_ttl(&self) -> Duration {
        Duration::from_secs(self.author_count_ttl_seconds)
    }

    /// The longest lifetime any entry can be given.
    pub fn longest_ttl(&self) -> Duration {
        self.article_ttl()
            .max(self.statistics_ttl())
            .max(self.author_count_ttl())
    }
}

//! Content cache.
//!
//! Reads go through [`CacheStore`], which serializes values as JSON into a
//! [`CacheBackend`] (in-process LRU or Redis). Writes call [`CacheTrigger`]
//! after they commit; the trigger plans which entries are stale and deletes
//! them. List and aggregate entries are found through dependency edges the
//! backend keeps next to the entries, so a write in one process clears
//! entries filled by another.
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"   # or "redis"
//! capacity = 1000
//! article_ttl_seconds = 300
//! ```

mod backend;
mod config;
mod consumer;
mod events;
mod fence;
mod keys;
mod lock;
mod planner;
mod redis_backend;
mod registry;
mod store;
mod trigger;

use std::sync::Arc;

pub use backend::{CacheBackend, CacheError, MemoryCache};
pub use config::{CacheBackendKind, CacheConfig};
pub use consumer::{CacheConsumer, ConsumeReport};
pub use events::{CacheEvent, Epoch, EpochClock, EventKind};
pub use fence::ReadTicket;
pub use keys::{CacheKey, EntityKey, hash_article_list_key, hash_value};
pub use planner::ConsumptionPlan;
pub use redis_backend::RedisCache;
pub use store::CacheStore;
pub use trigger::CacheTrigger;

/// Store and trigger sharing one backend.
#[derive(Clone)]
pub struct CacheHandles {
    pub store: Arc<CacheStore>,
    pub trigger: Arc<CacheTrigger>,
}

impl CacheHandles {
    pub fn new(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        let store = Arc::new(CacheStore::new(config, backend));
        let consumer = Arc::new(CacheConsumer::new(store.clone()));
        let trigger = Arc::new(CacheTrigger::new(consumer));
        Self { store, trigger }
    }

    pub fn in_memory(config: CacheConfig) -> Self {
        let backend = Arc::new(MemoryCache::new(&config));
        Self::new(config, backend)
    }

    /// Build the backend named by `config`.
    pub async fn connect(config: CacheConfig) -> Result<Self, CacheError> {
        match config.backend {
            CacheBackendKind::Memory => Ok(Self::in_memory(config)),
            CacheBackendKind::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| CacheError::Backend {
                    backend: "redis",
                    message: "cache.redis_url is required for the redis backend".to_string(),
                })?;
                let backend = Arc::new(
                    RedisCache::connect(&url, config.key_prefix.clone(), config.longest_ttl())
                        .await?,
                );
                Ok(Self::new(config, backend))
            }
        }
    }
}

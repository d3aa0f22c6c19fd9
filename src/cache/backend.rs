//! Key-value backends behind the cache facade.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use thiserror::Error;

use super::config::CacheConfig;
use super::lock::rw_write;
use super::registry::CacheRegistry;

const SOURCE: &str = "cache::backend";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend `{backend}` failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
    #[error("cache payload could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    pub fn backend(backend: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            backend,
            message: err.to_string(),
        }
    }
}

/// Get, set-with-TTL and delete over string payloads, plus the dependency
/// edges that let a write find derived entries.
///
/// Edges live next to the entries they describe, so every process sharing a
/// backend sees the same ones.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Record that `key`, living for `ttl`, was computed from `entities`.
    async fn track(
        &self,
        key: &str,
        entities: &[String],
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Live keys currently tracked against `entity`.
    async fn tracked(&self, entity: &str) -> Result<Vec<String>, CacheError>;

    /// Drain the keys tracked against `entity`.
    async fn take_tracked(&self, entity: &str) -> Result<Vec<String>, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process LRU with per-entry expiry.
///
/// An entry's dependency edges are dropped whenever the entry leaves the LRU,
/// so the index never names more keys than the cache can hold.
pub struct MemoryCache {
    entries: RwLock<LruCache<String, Entry>>,
    registry: CacheRegistry,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
            registry: CacheRegistry::new(),
        }
    }

    pub fn len(&self) -> usize {
        rw_write(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys that currently carry dependency edges.
    pub fn tracked_len(&self) -> usize {
        self.registry.key_count()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
            drop(entries);
            self.registry.unregister(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let displaced = rw_write(&self.entries, SOURCE, "set").push(key.to_string(), entry);
        if let Some((displaced, _)) = displaced
            && displaced != key
        {
            self.registry.unregister(&displaced);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
        self.registry.unregister(key);
        Ok(())
    }

    async fn track(
        &self,
        key: &str,
        entities: &[String],
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        self.registry.register(key, entities);
        Ok(())
    }

    async fn tracked(&self, entity: &str) -> Result<Vec<String>, CacheError> {
        Ok(self.registry.keys_for_entity(entity).into_iter().collect())
    }

    async fn take_tracked(&self, entity: &str) -> Result<Vec<String>, CacheError> {
        Ok(self.registry.unregister_entity(entity).into_iter().collect())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn cache(capacity: usize) -> MemoryCache {
        MemoryCache::new(&CacheConfig {
            capacity,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn set_get_delete_roundtrip() {
        let cache = cache(8);
        cache
            .set("article:slug:a", "{}".into(), Duration::from_secs(60))
            .await
            .expect("set");
        assert_eq!(
            cache.get("article:slug:a").await.expect("get").as_deref(),
            Some("{}")
        );

        cache.delete("article:slug:a").await.expect("delete");
        assert!(cache.get("article:slug:a").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_dropped() {
        let cache = cache(8);
        cache
            .set("k", "v".into(), Duration::ZERO)
            .await
            .expect("set");
        assert!(cache.get("k").await.expect("get").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted() {
        let cache = cache(2);
        let ttl = Duration::from_secs(60);
        cache.set("a", "1".into(), ttl).await.expect("set");
        cache.set("b", "2".into(), ttl).await.expect("set");
        cache.get("a").await.expect("get");
        cache.set("c", "3".into(), ttl).await.expect("set");

        assert!(cache.get("b").await.expect("get").is_none());
        assert!(cache.get("a").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn tracked_keys_are_drained_once() {
        let cache = cache(8);
        let index = vec!["articles:index".to_string()];
        let ttl = Duration::from_secs(60);
        cache.track("articles:list:1", &index, ttl).await.expect("track");
        cache.set("articles:list:1", "[]".into(), ttl).await.expect("set");

        assert_eq!(
            cache.tracked("articles:index").await.expect("tracked"),
            vec!["articles:list:1".to_string()]
        );
        assert_eq!(
            cache.take_tracked("articles:index").await.expect("take"),
            vec!["articles:list:1".to_string()]
        );
        assert!(cache.take_tracked("articles:index").await.expect("take").is_empty());
    }

    #[tokio::test]
    async fn displaced_and_expired_entries_release_their_edges() {
        let cache = cache(4);
        let index = vec!["articles:index".to_string()];
        let ttl = Duration::from_millis(1);

        for i in 0..10_000 {
            let key = format!("articles:list:{i}");
            cache.track(&key, &index, ttl).await.expect("track");
            cache.set(&key, "[]".into(), ttl).await.expect("set");
        }
        assert!(cache.tracked_len() <= 4);

        tokio::time::sleep(Duration::from_millis(5)).await;
        for i in 9_996..10_000 {
            let key = format!("articles:list:{i}");
            assert!(cache.get(&key).await.expect("get").is_none());
        }
        assert_eq!(cache.tracked_len(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn deleting_an_entry_releases_its_edges() {
        let cache = cache(4);
        let deps = vec!["article:1".to_string(), "slug:hello".to_string()];
        let ttl = Duration::from_secs(60);
        cache.track("article:slug:hello", &deps, ttl).await.expect("track");
        cache.set("article:slug:hello", "{}".into(), ttl).await.expect("set");

        cache.delete("article:slug:hello").await.expect("delete");

        assert_eq!(cache.tracked_len(), 0);
        assert!(cache.tracked("slug:hello").await.expect("tracked").is_empty());
    }

    #[tokio::test]
    async fn memory_cache_recovers_from_poisoned_lock() {
        let cache = cache(4);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.entries.write().expect("lock should be acquired");
            panic!("poison cache lock");
        }));

        cache
            .set("k", "v".into(), Duration::from_secs(5))
            .await
            .expect("set");
        assert_eq!(cache.len(), 1);
    }
}

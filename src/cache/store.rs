//! Typed access to the configured cache backend.
//!
//! Reads never fail: backend or decoding errors are logged and reported as a
//! miss so the caller falls through to storage.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::backend::{CacheBackend, CacheError};
use super::config::CacheConfig;
use super::fence::{InvalidationFence, ReadTicket};
use super::keys::{CacheKey, EntityKey};

pub(crate) const METRIC_CACHE_HIT: &str = "content_hub_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "content_hub_cache_miss_total";
pub(crate) const METRIC_CACHE_ERROR: &str = "content_hub_cache_error_total";
const METRIC_CACHE_FILL_SKIPPED: &str = "content_hub_cache_fill_skipped_total";

pub struct CacheStore {
    config: CacheConfig,
    backend: Arc<dyn CacheBackend>,
    fence: InvalidationFence,
}

impl CacheStore {
    pub fn new(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            fence: InvalidationFence::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Take before the lookup whose miss will be filled with [`Self::put_json`].
    pub fn read_ticket(&self) -> ReadTicket {
        self.fence.ticket()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if !self.config.is_enabled() {
            return None;
        }

        let rendered = key.to_string();
        let raw = match self.backend.get(&rendered).await {
            Ok(raw) => raw,
            Err(err) => {
                self.record_error("get", &rendered, &err);
                return None;
            }
        };

        let Some(raw) = raw else {
            counter!(METRIC_CACHE_MISS).increment(1);
            debug!(key = %rendered, "Cache miss");
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                debug!(key = %rendered, "Cache hit");
                Some(value)
            }
            Err(err) => {
                self.record_error("decode", &rendered, &CacheError::from(err));
                None
            }
        }
    }

    /// Store `value` and record the entities it was computed from.
    ///
    /// Nothing is stored when one of those entities, or the entity owning
    /// `key`, was invalidated after `ticket` was taken. If that happens while
    /// the entry is being written, the entry is deleted again.
    pub async fn put_json<T: Serialize>(
        &self,
        key: CacheKey,
        value: &T,
        ttl: Duration,
        depends_on: HashSet<EntityKey>,
        ticket: ReadTicket,
    ) {
        if !self.config.is_enabled() {
            return;
        }

        let rendered = key.to_string();
        let mut guarded = depends_on.clone();
        guarded.extend(key.owner());
        if self.fence.invalidated_since(&guarded, ticket) {
            self.record_skip(&rendered);
            return;
        }

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                self.record_error("encode", &rendered, &CacheError::from(err));
                return;
            }
        };

        if !depends_on.is_empty() {
            let entities: Vec<String> = depends_on.iter().map(ToString::to_string).collect();
            if let Err(err) = self.backend.track(&rendered, &entities, ttl).await {
                // An untracked entry could outlive the writes that make it stale.
                self.record_error("track", &rendered, &err);
                return;
            }
        }
        if let Err(err) = self.backend.set(&rendered, payload, ttl).await {
            self.record_error("set", &rendered, &err);
            return;
        }

        if self.fence.invalidated_since(&guarded, ticket) {
            self.record_skip(&rendered);
            if let Err(err) = self.backend.delete(&rendered).await {
                self.record_error("delete", &rendered, &err);
            }
        }
    }

    /// Stamp `entities` so that fills which read them earlier are dropped.
    pub(crate) fn mark_invalidated<'a>(&self, entities: impl IntoIterator<Item = &'a EntityKey>) {
        self.fence.mark(entities);
    }

    /// Keys tracked against `entity`, without releasing them.
    pub async fn dependents(&self, entity: &EntityKey) -> Result<Vec<String>, CacheError> {
        self.backend.tracked(&entity.to_string()).await
    }

    /// Keys tracked against `entity`; the edges are released.
    pub async fn take_dependents(&self, entity: &EntityKey) -> Result<Vec<String>, CacheError> {
        self.backend.take_tracked(&entity.to_string()).await
    }

    pub async fn evict(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.evict_rendered(&key.to_string()).await
    }

    /// Delete one entry by its rendered name.
    pub async fn evict_rendered(&self, key: &str) -> Result<(), CacheError> {
        self.backend.delete(key).await
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.backend.ping().await
    }

    fn record_skip(&self, key: &str) {
        counter!(METRIC_CACHE_FILL_SKIPPED).increment(1);
        debug!(key, "Cache fill skipped: inputs were invalidated during the read");
    }

    fn record_error(&self, op: &'static str, key: &str, err: &CacheError) {
        counter!(METRIC_CACHE_ERROR, "op" => op).increment(1);
        warn!(
            op,
            key,
            backend = self.backend.name(),
            error = %err,
            "Cache operation failed; continuing without cache"
        );
    }
}

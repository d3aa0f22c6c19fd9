//! Redis-backed cache shared between processes.
//!
//! Dependency edges are sorted sets named `deps:<entity>`, scored by the
//! unix time at which the member entry expires. Adding an edge prunes members
//! that have already expired, and the set itself expires once its longest
//! lived member could no longer exist.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use time::OffsetDateTime;
use tracing::debug;

use super::backend::{CacheBackend, CacheError};

const BACKEND: &str = "redis";

pub struct RedisCache {
    connection: ConnectionManager,
    key_prefix: String,
    /// Lifetime of a dependency set; at least the longest entry TTL.
    tracking_ttl: Duration,
}

impl RedisCache {
    pub async fn connect(
        url: &str,
        key_prefix: impl Into<String>,
        tracking_ttl: Duration,
    ) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|err| CacheError::backend(BACKEND, err))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|err| CacheError::backend(BACKEND, err))?;
        Ok(Self {
            connection,
            key_prefix: key_prefix.into(),
            tracking_ttl,
        })
    }

    fn key(&self, key: &str) -> String {
        prefixed(&self.key_prefix, key)
    }

    fn tracking_key(&self, entity: &str) -> String {
        prefixed(&self.key_prefix, &format!("deps:{entity}"))
    }
}

fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1)
}

fn prefixed(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}:{key}")
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();
        conn.get::<_, Option<String>>(&full_key)
            .await
            .map_err(|err| CacheError::backend(BACKEND, err))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let full_key = self.key(key);
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(&full_key, value, seconds)
            .await
            .map_err(|err| CacheError::backend(BACKEND, err))?;
        debug!(key = %full_key, ttl_secs = seconds, "Cache set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();
        let deleted: i64 = conn
            .del(&full_key)
            .await
            .map_err(|err| CacheError::backend(BACKEND, err))?;
        debug!(key = %full_key, deleted = deleted > 0, "Cache delete");
        Ok(())
    }

    async fn track(
        &self,
        key: &str,
        entities: &[String],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if entities.is_empty() {
            return Ok(());
        }

        let now = unix_now();
        let expires_at = now.saturating_add(seconds(ttl));
        let keep_for = seconds(self.tracking_ttl.max(ttl));
        let mut pipe = redis::pipe();
        pipe.atomic();
        for entity in entities {
            let set = self.tracking_key(entity);
            pipe.zadd(&set, key, expires_at)
                .ignore()
                .zrembyscore(&set, "-inf", now)
                .ignore()
                .expire(&set, keep_for)
                .ignore();
        }

        let mut conn = self.connection.clone();
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|err| CacheError::backend(BACKEND, err))?;
        debug!(key, entities = entities.len(), "Cache dependencies tracked");
        Ok(())
    }

    async fn tracked(&self, entity: &str) -> Result<Vec<String>, CacheError> {
        let set = self.tracking_key(entity);
        let mut conn = self.connection.clone();
        conn.zrangebyscore(&set, unix_now(), "+inf")
            .await
            .map_err(|err| CacheError::backend(BACKEND, err))
    }

    async fn take_tracked(&self, entity: &str) -> Result<Vec<String>, CacheError> {
        let set = self.tracking_key(entity);
        let mut conn = self.connection.clone();
        let (keys,): (Vec<String>,) = redis::pipe()
            .atomic()
            .zrangebyscore(&set, unix_now(), "+inf")
            .del(&set)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|err| CacheError::backend(BACKEND, err))?;
        debug!(set = %set, keys = keys.len(), "Cache dependencies drained");
        Ok(keys)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|err| CacheError::backend(BACKEND, err))?;
        Ok(())
    }
}

//! Poison-tolerant guards for the in-process cache state.
//!
//! A panic while holding a cache lock must not take the cache down with it:
//! every cached value can be rebuilt from storage, so the guard is recovered
//! and the event is logged and counted.

use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use metrics::counter;
use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), source, op, "read")
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), source, op, "write")
}

fn recover<G>(
    result: LockResult<G>,
    source: &'static str,
    op: &'static str,
    mode: &'static str,
) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target = "content_hub::cache::lock",
            source,
            op,
            mode,
            "recovered poisoned cache lock; entries may be stale until invalidated"
        );
        counter!("content_hub_cache_lock_poisoned_total", "source" => source).increment(1);
        poisoned.into_inner()
    })
}

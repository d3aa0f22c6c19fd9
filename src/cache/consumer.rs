//! Executes consumption plans against the cache store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{info, instrument, warn};

use super::planner::ConsumptionPlan;
use super::store::{CacheStore, METRIC_CACHE_ERROR};

const METRIC_CACHE_INVALIDATE_MS: &str = "content_hub_cache_invalidate_ms";

/// Outcome of one plan execution.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeReport {
    pub evicted: usize,
    pub failed: usize,
}

pub struct CacheConsumer {
    store: Arc<CacheStore>,
}

impl CacheConsumer {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Delete every entry the plan names.
    ///
    /// Backend failures are logged and counted but never returned: the write
    /// that produced the plan has already committed.
    #[instrument(skip(self, plan), fields(plan = %plan))]
    pub async fn execute(&self, plan: &ConsumptionPlan) -> ConsumeReport {
        let started_at = Instant::now();
        let mut report = ConsumeReport::default();
        if plan.is_empty() {
            return report;
        }

        // Stamp first: a fill that read these entities before this point must
        // not land after the deletes below.
        self.store.mark_invalidated(&plan.invalidate_entities);

        let mut keys: HashSet<String> = HashSet::new();
        for entity in &plan.invalidate_entities {
            keys.extend(entity.direct_keys().iter().map(ToString::to_string));
            match self.store.take_dependents(entity).await {
                Ok(tracked) => keys.extend(tracked),
                Err(err) => {
                    report.failed += 1;
                    counter!(METRIC_CACHE_ERROR, "op" => "take_tracked").increment(1);
                    warn!(
                        entity = %entity,
                        backend = self.store.backend_name(),
                        error = %err,
                        "Could not read tracked dependents; derived entries may be served stale until they expire"
                    );
                }
            }
        }

        for key in &keys {
            match self.store.evict_rendered(key).await {
                Ok(()) => report.evicted += 1,
                Err(err) => {
                    report.failed += 1;
                    counter!(METRIC_CACHE_ERROR, "op" => "invalidate").increment(1);
                    warn!(
                        key = %key,
                        backend = self.store.backend_name(),
                        error = %err,
                        "Cache invalidation failed; entry may be served stale until it expires"
                    );
                }
            }
        }

        info!(
            entities = plan.invalidate_entities.len(),
            evicted = report.evicted,
            failed = report.failed,
            "Cache invalidation complete"
        );
        histogram!(METRIC_CACHE_INVALIDATE_MS)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        report
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }
}

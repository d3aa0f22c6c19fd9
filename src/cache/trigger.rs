//! Post-write invalidation step.
//!
//! Services call the trigger right after a write commits. The event is
//! planned and executed before the call returns, so a read issued after the
//! write never sees the entry that existed before it.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::consumer::{CacheConsumer, ConsumeReport};
use super::events::{EpochClock, EventKind};
use super::planner::ConsumptionPlan;

pub struct CacheTrigger {
    enabled: bool,
    clock: EpochClock,
    consumer: Arc<CacheConsumer>,
}

impl CacheTrigger {
    pub fn new(consumer: Arc<CacheConsumer>) -> Self {
        Self {
            enabled: consumer.store().config().is_enabled(),
            clock: EpochClock::new(),
            consumer,
        }
    }

    /// Plan and execute invalidation for one write.
    pub async fn trigger(&self, kind: EventKind) -> ConsumeReport {
        if !self.enabled {
            debug!(event_kind = ?kind, "Cache trigger skipped: cache disabled");
            return ConsumeReport::default();
        }

        let event = self.clock.event(kind);
        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = event.kind.label(),
            "Cache event emitted"
        );
        let plan = ConsumptionPlan::from_events(vec![event]);
        self.consumer.execute(&plan).await
    }

    pub async fn article_upserted(&self, article_id: Uuid, slug: &str, author_id: Uuid) {
        self.trigger(EventKind::ArticleUpserted {
            article_id,
            slug: slug.to_string(),
            author_id,
        })
        .await;
    }

    pub async fn article_deleted(&self, article_id: Uuid, slug: &str, author_id: Uuid) {
        self.trigger(EventKind::ArticleDeleted {
            article_id,
            slug: slug.to_string(),
            author_id,
        })
        .await;
    }

    pub async fn comment_upserted(&self, comment_id: Uuid, article_id: Uuid, parent_id: Option<Uuid>) {
        self.trigger(EventKind::CommentUpserted {
            comment_id,
            article_id,
            parent_id,
        })
        .await;
    }

    pub async fn comment_deleted(&self, comment_id: Uuid, article_id: Uuid, parent_id: Option<Uuid>) {
        self.trigger(EventKind::CommentDeleted {
            comment_id,
            article_id,
            parent_id,
        })
        .await;
    }

    pub fn consumer(&self) -> &Arc<CacheConsumer> {
        &self.consumer
    }
}

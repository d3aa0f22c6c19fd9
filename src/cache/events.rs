//! Cache events emitted by write paths.

use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use uuid::Uuid;

/// Monotonic epoch for ordering events within this process.
pub type Epoch = u64;

/// Cache event with idempotency and ordering support.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier for idempotency.
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Writes that make cached entries stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// An article was created, updated or restored.
    ArticleUpserted {
        article_id: Uuid,
        slug: String,
        author_id: Uuid,
    },
    /// An article was soft-deleted.
    ArticleDeleted {
        article_id: Uuid,
        slug: String,
        author_id: Uuid,
    },
    /// A comment was created, updated or restored.
    CommentUpserted {
        comment_id: Uuid,
        article_id: Uuid,
        parent_id: Option<Uuid>,
    },
    /// A comment was soft-deleted.
    CommentDeleted {
        comment_id: Uuid,
        article_id: Uuid,
        parent_id: Option<Uuid>,
    },
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::ArticleUpserted { .. } => "article_upserted",
            EventKind::ArticleDeleted { .. } => "article_deleted",
            EventKind::CommentUpserted { .. } => "comment_upserted",
            EventKind::CommentDeleted { .. } => "comment_deleted",
        }
    }
}

/// Hands out epochs in increasing order.
#[derive(Debug, Default)]
pub struct EpochClock {
    counter: AtomicU64,
}

impl EpochClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Epoch {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }

    /// The epoch the next call to [`EpochClock::next`] will hand out.
    pub fn current(&self) -> Epoch {
        self.counter.load(Ordering::SeqCst)
    }

    /// Stamp `kind` with the next epoch.
    pub fn event(&self, kind: EventKind) -> CacheEvent {
        CacheEvent::new(kind, self.next())
    }
}

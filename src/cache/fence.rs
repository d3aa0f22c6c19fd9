//! Guards read-through fills against invalidations that ran during the read.
//!
//! A reader takes a [`ReadTicket`] before it looks at the cache. Invalidation
//! stamps every entity it clears with a fresh epoch. A fill whose inputs were
//! stamped after the ticket was issued is stale and must not be stored.
//!
//! Entities share a fixed number of stripes, so a stamp on one entity can
//! occasionally suppress a fill for an unrelated one; that only costs a miss.

use std::sync::atomic::{AtomicU64, Ordering};

use super::events::{Epoch, EpochClock};
use super::keys::{EntityKey, hash_value};

const STRIPES: usize = 64;

/// Epoch observed when a read-through lookup began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTicket(Epoch);

pub(crate) struct InvalidationFence {
    clock: EpochClock,
    stripes: [AtomicU64; STRIPES],
}

impl InvalidationFence {
    pub fn new() -> Self {
        Self {
            clock: EpochClock::new(),
            stripes: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn ticket(&self) -> ReadTicket {
        ReadTicket(self.clock.current())
    }

    /// Stamp `entities` as invalidated now.
    pub fn mark<'a>(&self, entities: impl IntoIterator<Item = &'a EntityKey>) {
        let epoch = self.clock.next() + 1;
        for entity in entities {
            self.stripe(entity).fetch_max(epoch, Ordering::SeqCst);
        }
    }

    /// Whether any of `entities` was invalidated after `ticket` was issued.
    pub fn invalidated_since<'a>(
        &self,
        entities: impl IntoIterator<Item = &'a EntityKey>,
        ticket: ReadTicket,
    ) -> bool {
        entities
            .into_iter()
            .any(|entity| self.stripe(entity).load(Ordering::SeqCst) > ticket.0)
    }

    fn stripe(&self, entity: &EntityKey) -> &AtomicU64 {
        let index = (hash_value(entity) % STRIPES as u64) as usize;
        &self.stripes[index]
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn invalidation_after_ticket_is_seen() {
        let fence = InvalidationFence::new();
        let article = EntityKey::Article(Uuid::new_v4());

        let ticket = fence.ticket();
        assert!(!fence.invalidated_since([&article], ticket));

        fence.mark([&article]);
        assert!(fence.invalidated_since([&article], ticket));
    }

    #[test]
    fn invalidation_before_ticket_is_ignored() {
        let fence = InvalidationFence::new();
        let article = EntityKey::Article(Uuid::new_v4());

        fence.mark([&article]);
        fence.mark([&EntityKey::ArticlesIndex]);
        let ticket = fence.ticket();

        assert!(!fence.invalidated_since([&article, &EntityKey::ArticlesIndex], ticket));
    }

    #[test]
    fn concurrent_readers_each_keep_their_own_ticket() {
        let fence = InvalidationFence::new();
        let slug = EntityKey::ArticleSlug("hello".into());

        let early = fence.ticket();
        fence.mark([&slug]);
        let late = fence.ticket();

        assert!(fence.invalidated_since([&slug], early));
        assert!(!fence.invalidated_since([&slug], late));
    }
}

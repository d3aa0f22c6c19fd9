//! Consumption plan generation.
//!
//! Merges cache events into the set of entities whose entries must go.

use std::collections::{HashMap, HashSet};
use std::fmt;

use uuid::Uuid;

use super::events::{CacheEvent, EventKind};
use super::keys::EntityKey;

#[derive(Debug, Default)]
pub struct ConsumptionPlan {
    /// Entities to invalidate from cache.
    pub invalidate_entities: HashSet<EntityKey>,
    /// Number of distinct events merged into this plan.
    pub merged_events: usize,
}

impl fmt::Display for ConsumptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConsumptionPlan {{ events: {}, invalidate: {} }}",
            self.merged_events,
            self.invalidate_entities.len()
        )
    }
}

impl ConsumptionPlan {
    /// Merge events into a plan.
    ///
    /// Events are deduplicated by id and only the latest epoch per article or
    /// comment is kept.
    pub fn from_events(events: Vec<CacheEvent>) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();
        let events: Vec<_> = events
            .into_iter()
            .filter(|event| seen_ids.insert(event.id))
            .collect();
        plan.merged_events = events.len();

        let mut article_epochs: HashMap<Uuid, (u64, EventKind)> = HashMap::new();
        let mut comment_epochs: HashMap<Uuid, (u64, EventKind)> = HashMap::new();

        for event in events {
            let latest = match &event.kind {
                EventKind::ArticleUpserted { article_id, .. }
                | EventKind::ArticleDeleted { article_id, .. } => {
                    article_epochs.entry(*article_id)
                }
                EventKind::CommentUpserted { comment_id, .. }
                | EventKind::CommentDeleted { comment_id, .. } => {
                    comment_epochs.entry(*comment_id)
                }
            };
            latest
                .and_modify(|(epoch, kind)| {
                    if event.epoch > *epoch {
                        *epoch = event.epoch;
                        *kind = event.kind.clone();
                    }
                })
                .or_insert((event.epoch, event.kind.clone()));
        }

        for (_, kind) in article_epochs.into_values() {
            match kind {
                EventKind::ArticleUpserted {
                    article_id,
                    slug,
                    author_id,
                } => {
                    plan.invalidate_article(article_id, slug, author_id);
                }
                EventKind::ArticleDeleted {
                    article_id,
                    slug,
                    author_id,
                } => {
                    plan.invalidate_article(article_id, slug, author_id);
                    plan.invalidate_entities
                        .insert(EntityKey::ArticleComments(article_id));
                }
                _ => {}
            }
        }

        for (_, kind) in comment_epochs.into_values() {
            if let EventKind::CommentUpserted {
                comment_id,
                article_id,
                parent_id,
            }
            | EventKind::CommentDeleted {
                comment_id,
                article_id,
                parent_id,
            } = kind
            {
                plan.invalidate_entities.insert(EntityKey::Comment(comment_id));
                plan.invalidate_entities
                    .insert(EntityKey::ArticleComments(article_id));
                // A parent's cached payload embeds its replies.
                if let Some(parent_id) = parent_id {
                    plan.invalidate_entities.insert(EntityKey::Comment(parent_id));
                }
                plan.invalidate_entities.insert(EntityKey::ArticlesIndex);
            }
        }

        plan
    }

    fn invalidate_article(&mut self, article_id: Uuid, slug: String, author_id: Uuid) {
        self.invalidate_entities.insert(EntityKey::Article(article_id));
        self.invalidate_entities.insert(EntityKey::ArticleSlug(slug));
        self.invalidate_entities.insert(EntityKey::Author(author_id));
        self.invalidate_entities.insert(EntityKey::ArticlesIndex);
    }

    pub fn is_empty(&self) -> bool {
        self.invalidate_entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_event(kind_deleted: bool, id: Uuid, epoch: u64) -> CacheEvent {
        let (slug, author_id) = ("hello-world".to_string(), Uuid::nil());
        let kind = if kind_deleted {
            EventKind::ArticleDeleted {
                article_id: id,
                slug,
                author_id,
            }
        } else {
            EventKind::ArticleUpserted {
                article_id: id,
                slug,
                author_id,
            }
        };
        CacheEvent::new(kind, epoch)
    }

    #[test]
    fn article_write_invalidates_id_slug_and_derived_entries() {
        let id = Uuid::new_v4();
        let plan = ConsumptionPlan::from_events(vec![article_event(false, id, 1)]);

        assert!(plan.invalidate_entities.contains(&EntityKey::Article(id)));
        assert!(
            plan.invalidate_entities
                .contains(&EntityKey::ArticleSlug("hello-world".into()))
        );
        assert!(plan.invalidate_entities.contains(&EntityKey::Author(Uuid::nil())));
        assert!(plan.invalidate_entities.contains(&EntityKey::ArticlesIndex));
        assert!(!plan.invalidate_entities.contains(&EntityKey::ArticleComments(id)));
    }

    #[test]
    fn latest_epoch_wins_per_article() {
        let id = Uuid::new_v4();
        let plan = ConsumptionPlan::from_events(vec![
            article_event(true, id, 5),
            article_event(false, id, 2),
        ]);
        assert!(plan.invalidate_entities.contains(&EntityKey::ArticleComments(id)));
        assert_eq!(plan.merged_events, 2);
    }

    #[test]
    fn duplicate_events_are_merged() {
        let event = article_event(false, Uuid::new_v4(), 1);
        let plan = ConsumptionPlan::from_events(vec![event.clone(), event]);
        assert_eq!(plan.merged_events, 1);
    }

    #[test]
    fn reply_write_invalidates_parent_and_article_listing() {
        let (comment_id, article_id, parent_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let plan = ConsumptionPlan::from_events(vec![CacheEvent::new(
            EventKind::CommentUpserted {
                comment_id,
                article_id,
                parent_id: Some(parent_id),
            },
            0,
        )]);

        assert!(plan.invalidate_entities.contains(&EntityKey::Comment(comment_id)));
        assert!(plan.invalidate_entities.contains(&EntityKey::Comment(parent_id)));
        assert!(
            plan.invalidate_entities
                .contains(&EntityKey::ArticleComments(article_id))
        );
        assert!(!plan.is_empty());
    }
}

//! Bidirectional dependency index for the in-process backend.
//!
//! Tracks which entries were computed from which entities so that a write can
//! delete exactly the affected entries instead of scanning by key pattern.
//! Both sides are rendered key strings, the same names the backend stores.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

#[derive(Default)]
struct Mappings {
    entity_to_keys: HashMap<String, HashSet<String>>,
    key_to_entities: HashMap<String, HashSet<String>>,
}

/// Tracks entity → cache keys and cache key → entities mappings.
pub(crate) struct CacheRegistry {
    mappings: RwLock<Mappings>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self {
            mappings: RwLock::new(Mappings::default()),
        }
    }

    /// Register a cache entry with the entities it was computed from.
    ///
    /// Re-registering a key replaces its previous dependencies.
    pub fn register(&self, cache_key: &str, entities: &[String]) {
        let mut guard = rw_write(&self.mappings, SOURCE, "register");
        let mappings = &mut *guard;

        if let Some(previous) = mappings.key_to_entities.remove(cache_key) {
            for entity in previous {
                detach(&mut mappings.entity_to_keys, &entity, cache_key);
            }
        }
        if entities.is_empty() {
            return;
        }
        for entity in entities {
            mappings
                .entity_to_keys
                .entry(entity.clone())
                .or_default()
                .insert(cache_key.to_string());
        }
        mappings
            .key_to_entities
            .insert(cache_key.to_string(), entities.iter().cloned().collect());
    }

    pub fn keys_for_entity(&self, entity: &str) -> HashSet<String> {
        rw_read(&self.mappings, SOURCE, "keys_for_entity")
            .entity_to_keys
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn entities_for_key(&self, cache_key: &str) -> HashSet<String> {
        rw_read(&self.mappings, SOURCE, "entities_for_key")
            .key_to_entities
            .get(cache_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget a cache key and every entity edge pointing at it.
    pub fn unregister(&self, cache_key: &str) {
        let mut guard = rw_write(&self.mappings, SOURCE, "unregister");
        let mappings = &mut *guard;

        if let Some(entities) = mappings.key_to_entities.remove(cache_key) {
            for entity in entities {
                detach(&mut mappings.entity_to_keys, &entity, cache_key);
            }
        }
    }

    /// Remove all mappings for an entity, returning the keys that depended on it.
    pub fn unregister_entity(&self, entity: &str) -> HashSet<String> {
        let mut guard = rw_write(&self.mappings, SOURCE, "unregister_entity");
        let mappings = &mut *guard;

        let affected = mappings.entity_to_keys.remove(entity).unwrap_or_default();
        for cache_key in &affected {
            if let Some(entities) = mappings.key_to_entities.get_mut(cache_key) {
                entities.remove(entity);
                if entities.is_empty() {
                    mappings.key_to_entities.remove(cache_key);
                }
            }
        }
        affected
    }

    #[cfg(test)]
    pub fn entity_count(&self) -> usize {
        rw_read(&self.mappings, SOURCE, "entity_count")
            .entity_to_keys
            .len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.mappings, SOURCE, "key_count")
            .key_to_entities
            .len()
    }
}

fn detach(entity_to_keys: &mut HashMap<String, HashSet<String>>, entity: &str, cache_key: &str) {
    if let Some(keys) = entity_to_keys.get_mut(entity) {
        keys.remove(cache_key);
        if keys.is_empty() {
            entity_to_keys.remove(entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use uuid::Uuid;

    use super::*;
    use crate::cache::keys::{CacheKey, EntityKey};

    fn deps(entities: &[EntityKey]) -> Vec<String> {
        entities.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn register_and_lookup() {
        let registry = CacheRegistry::new();
        let article_id = Uuid::new_v4();
        let entity = EntityKey::Article(article_id).to_string();
        let cache_key = CacheKey::ArticleById(article_id).to_string();

        registry.register(&cache_key, std::slice::from_ref(&entity));

        assert!(registry.keys_for_entity(&entity).contains(&cache_key));
        assert!(registry.entities_for_key(&cache_key).contains(&entity));
    }

    #[test]
    fn unregister_cleans_up_mappings() {
        let registry = CacheRegistry::new();
        let cache_key = CacheKey::Statistics.to_string();
        registry.register(&cache_key, &deps(&[EntityKey::ArticlesIndex]));
        assert_eq!(registry.key_count(), 1);
        assert_eq!(registry.entity_count(), 1);

        registry.unregister(&cache_key);
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.entity_count(), 0);
    }

    #[test]
    fn reregistering_replaces_dependencies() {
        let registry = CacheRegistry::new();
        let author = EntityKey::Author(Uuid::new_v4());
        let key = CacheKey::ArticleList { filter_hash: 7 }.to_string();

        registry.register(&key, &deps(&[author.clone()]));
        registry.register(&key, &deps(&[EntityKey::ArticlesIndex]));

        assert!(registry.keys_for_entity(&author.to_string()).is_empty());
        assert!(
            registry
                .keys_for_entity(&EntityKey::ArticlesIndex.to_string())
                .contains(&key)
        );
    }

    #[test]
    fn unregister_entity_returns_affected_keys() {
        let registry = CacheRegistry::new();
        let key1 = CacheKey::ArticleList { filter_hash: 0 }.to_string();
        let key2 = CacheKey::ArticleList { filter_hash: 1 }.to_string();
        let index = deps(&[EntityKey::ArticlesIndex]);

        registry.register(&key1, &index);
        registry.register(&key2, &index);

        let affected = registry.unregister_entity(&index[0]);
        assert_eq!(affected.len(), 2);
        assert!(affected.contains(&key1));
        assert!(affected.contains(&key2));
        assert_eq!(registry.key_count(), 0);
    }

    #[test]
    fn registry_recovers_from_poisoned_lock() {
        let registry = CacheRegistry::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = registry.mappings.write().expect("lock should be acquired");
            panic!("poison registry lock");
        }));

        registry.register("articles:statistics", &deps(&[EntityKey::ArticlesIndex]));
        assert_eq!(registry.key_count(), 1);
    }
}

//! Cache key definitions.
//!
//! `EntityKey` names something that can change, `CacheKey` names a stored entry.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{ArticleOrdering, ArticleQueryFilter};

/// Identifies a domain entity or derived collection for cache invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// An article identified by its id.
    Article(Uuid),
    /// An article identified by its slug.
    ArticleSlug(String),
    Comment(Uuid),
    /// The comment listing shown under an article.
    ArticleComments(Uuid),
    /// Per-author aggregates.
    Author(Uuid),
    /// Every list and aggregate computed over many articles.
    ArticlesIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    ArticleById(Uuid),
    ArticleBySlug(String),
    ArticleComments(Uuid),
    CommentById(Uuid),
    AuthorArticlesCount(Uuid),
    ArticleList { filter_hash: u64 },
    Statistics,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::ArticleById(id) => write!(f, "article:{id}"),
            CacheKey::ArticleBySlug(slug) => write!(f, "article:slug:{slug}"),
            CacheKey::ArticleComments(id) => write!(f, "article:{id}:comments"),
            CacheKey::CommentById(id) => write!(f, "comment:{id}"),
            CacheKey::AuthorArticlesCount(id) => write!(f, "author:{id}:articles_count"),
            CacheKey::ArticleList { filter_hash } => write!(f, "articles:list:{filter_hash:016x}"),
            CacheKey::Statistics => f.write_str("articles:statistics"),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Article(id) => write!(f, "article:{id}"),
            EntityKey::ArticleSlug(slug) => write!(f, "slug:{slug}"),
            EntityKey::Comment(id) => write!(f, "comment:{id}"),
            EntityKey::ArticleComments(id) => write!(f, "article:{id}:comments"),
            EntityKey::Author(id) => write!(f, "author:{id}"),
            EntityKey::ArticlesIndex => f.write_str("articles:index"),
        }
    }
}

impl CacheKey {
    /// The entity whose `direct_keys` include this entry, if any.
    pub fn owner(&self) -> Option<EntityKey> {
        match self {
            CacheKey::ArticleById(id) => Some(EntityKey::Article(*id)),
            CacheKey::ArticleBySlug(slug) => Some(EntityKey::ArticleSlug(slug.clone())),
            CacheKey::ArticleComments(id) => Some(EntityKey::ArticleComments(*id)),
            CacheKey::CommentById(id) => Some(EntityKey::Comment(*id)),
            CacheKey::AuthorArticlesCount(id) => Some(EntityKey::Author(*id)),
            CacheKey::Statistics => Some(EntityKey::ArticlesIndex),
            CacheKey::ArticleList { .. } => None,
        }
    }
}

impl EntityKey {
    /// Entries that are always derived from this entity, tracked or not.
    pub fn direct_keys(&self) -> Vec<CacheKey> {
        match self {
            EntityKey::Article(id) => vec![CacheKey::ArticleById(*id)],
            EntityKey::ArticleSlug(slug) => vec![CacheKey::ArticleBySlug(slug.clone())],
            EntityKey::Comment(id) => vec![CacheKey::CommentById(*id)],
            EntityKey::ArticleComments(id) => vec![CacheKey::ArticleComments(*id)],
            EntityKey::Author(id) => vec![CacheKey::AuthorArticlesCount(*id)],
            EntityKey::ArticlesIndex => vec![CacheKey::Statistics],
        }
    }
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash everything that shapes one page of an article listing.
pub fn hash_article_list_key(
    filter: &ArticleQueryFilter,
    ordering: ArticleOrdering,
    page: PageRequest,
) -> u64 {
    let mut hasher = DefaultHasher::new();
    filter.hash(&mut hasher);
    ordering.hash(&mut hasher);
    page.hash(&mut hasher);
    hasher.finish()
}

//! Named views over soft-deletable entities.
//!
//! Each view is a pure predicate. Repositories translate the same views into
//! SQL so that in-memory filtering and storage queries agree.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entities::{ArticleRecord, CommentRecord};
use super::lifecycle::SoftDeletable;

/// Entities that can be filtered through a [`Visibility`] view.
pub trait Visible: SoftDeletable {
    fn is_published(&self) -> bool {
        true
    }
}

impl Visible for ArticleRecord {
    fn is_published(&self) -> bool {
        self.is_published
    }
}

impl Visible for CommentRecord {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Every row, deleted or not.
    All,
    /// Rows that are not soft-deleted.
    Active,
    /// Active rows that are also published.
    Published,
}

impl Visibility {
    pub fn admits<E: Visible>(self, entity: &E) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Active => entity.is_active(),
            Visibility::Published => entity.is_active() && entity.is_published(),
        }
    }
}

/// Article query scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArticleScope {
    View(Visibility),
    /// Published articles together with the viewer's own active drafts.
    ///
    /// This is a union of two views, so an article that is both published
    /// and owned by the viewer appears exactly once.
    PublishedOrOwn { viewer: Uuid },
    /// Active articles written by `author`, published or not.
    AuthoredBy { author: Uuid },
}

impl ArticleScope {
    /// Scope used for public listings and lookups.
    pub fn for_viewer(viewer: Option<Uuid>) -> Self {
        match viewer {
            Some(viewer) => ArticleScope::PublishedOrOwn { viewer },
            None => ArticleScope::View(Visibility::Published),
        }
    }

    pub fn admits(&self, article: &ArticleRecord) -> bool {
        match *self {
            ArticleScope::View(visibility) => visibility.admits(article),
            ArticleScope::PublishedOrOwn { viewer } => {
                Visibility::Published.admits(article)
                    || (Visibility::Active.admits(article) && article.author_id == viewer)
            }
            ArticleScope::AuthoredBy { author } => {
                Visibility::Active.admits(article) && article.author_id == author
            }
        }
    }
}

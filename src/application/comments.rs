//! Comment reads, writes and one-level threading.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    ArticlesRepo, CommentQueryFilter, CommentWithAuthor, CommentsRepo, CommentsWriteRepo,
    CreateCommentParams, RepoError,
};
use crate::application::users::Principal;
use crate::cache::{CacheKey, CacheStore, CacheTrigger, EntityKey};
use crate::domain::comments::{MAX_REPLIES, ensure_parent_matches, get_replies, normalize_content};
use crate::domain::entities::{ArticleRecord, AuthorSummary, CommentRecord};
use crate::domain::error::DomainError;
use crate::domain::lifecycle::SoftDeletable;
use crate::domain::visibility::{ArticleScope, Visibility};

pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";

#[derive(Debug, Error)]
pub enum CommentError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("only the author may modify this comment")]
    Forbidden,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A comment with the replies displayed beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: CommentWithAuthor,
    pub replies: Vec<CommentWithAuthor>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentCommand {
    pub article_id: Uuid,
    pub content: String,
    pub parent_id: Option<Uuid>,
}

/// Attach replies to each top-level comment.
///
/// `candidates` may contain replies for any parent; [`get_replies`] decides
/// which ones are shown.
pub fn build_threads(
    roots: Vec<CommentWithAuthor>,
    candidates: Vec<CommentWithAuthor>,
) -> Vec<CommentThread> {
    let mut by_parent: HashMap<Uuid, Vec<CommentWithAuthor>> = HashMap::new();
    for candidate in candidates {
        if let Some(parent_id) = candidate.comment.parent_id {
            by_parent.entry(parent_id).or_default().push(candidate);
        }
    }

    roots
        .into_iter()
        .map(|root| {
            let children = by_parent.remove(&root.comment.id).unwrap_or_default();
            let mut authors: HashMap<Uuid, CommentWithAuthor> = children
                .into_iter()
                .map(|child| (child.comment.id, child))
                .collect();
            let records: Vec<CommentRecord> =
                authors.values().map(|child| child.comment.clone()).collect();
            let replies = get_replies(&root.comment, records)
                .into_iter()
                .filter_map(|reply| authors.remove(&reply.id))
                .collect();
            CommentThread {
                comment: root,
                replies,
            }
        })
        .collect()
}

/// Load replies for `roots` from storage and thread them.
pub(crate) async fn load_threads(
    reader: &dyn CommentsRepo,
    roots: Vec<CommentWithAuthor>,
) -> Result<Vec<CommentThread>, RepoError> {
    let parent_ids: Vec<Uuid> = roots
        .iter()
        .filter(|root| !root.comment.is_reply())
        .map(|root| root.comment.id)
        .collect();
    let candidates = if parent_ids.is_empty() {
        Vec::new()
    } else {
        reader.replies_for(&parent_ids, MAX_REPLIES).await?
    };
    Ok(build_threads(roots, candidates))
}

#[derive(Clone)]
pub struct CommentService {
    reader: Arc<dyn CommentsRepo>,
    writer: Arc<dyn CommentsWriteRepo>,
    articles: Arc<dyn ArticlesRepo>,
    cache: Arc<CacheStore>,
    trigger: Arc<CacheTrigger>,
}

impl CommentService {
    pub fn new(
        reader: Arc<dyn CommentsRepo>,
        writer: Arc<dyn CommentsWriteRepo>,
        articles: Arc<dyn ArticlesRepo>,
        cache: Arc<CacheStore>,
        trigger: Arc<CacheTrigger>,
    ) -> Self {
        Self {
            reader,
            writer,
            articles,
            cache,
            trigger,
        }
    }

    /// Active comments, newest first.
    pub async fn list(
        &self,
        filter: &CommentQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CommentWithAuthor>, CommentError> {
        Ok(self
            .reader
            .list_comments(Visibility::Active, filter, page)
            .await?)
    }

    pub async fn mine(
        &self,
        principal: &Principal,
        page: PageRequest,
    ) -> Result<Page<CommentWithAuthor>, CommentError> {
        let filter = CommentQueryFilter {
            author_id: Some(principal.user_id),
            ..CommentQueryFilter::default()
        };
        self.list(&filter, page).await
    }

    /// An active comment with its replies.
    pub async fn retrieve(&self, id: Uuid) -> Result<CommentThread, CommentError> {
        let key = CacheKey::CommentById(id);
        let ticket = self.cache.read_ticket();
        if let Some(cached) = self.cache.get_json::<CommentThread>(&key).await {
            return Ok(cached);
        }

        let comment = self
            .reader
            .find_comment(Visibility::Active, id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment"))?;
        let thread = load_threads(self.reader.as_ref(), vec![comment])
            .await?
            .pop()
            .ok_or_else(|| DomainError::invariant("thread for loaded comment missing"))?;

        let ttl = self.cache.config().article_ttl();
        let depends_on: HashSet<EntityKey> = [EntityKey::Comment(id)].into_iter().collect();
        self.cache
            .put_json(key, &thread, ttl, depends_on, ticket)
            .await;
        Ok(thread)
    }

    pub async fn create(
        &self,
        principal: &Principal,
        cmd: CreateCommentCommand,
    ) -> Result<CommentWithAuthor, CommentError> {
        let content = normalize_content(&cmd.content)?;

        let article = self.article_for_comment(cmd.article_id).await?;
        if !ArticleScope::for_viewer(Some(principal.user_id)).admits(&article) {
            return Err(DomainError::validation("article", "Invalid article.").into());
        }

        if let Some(parent_id) = cmd.parent_id {
            let parent = self
                .reader
                .find_comment(Visibility::Active, parent_id)
                .await?
                .ok_or_else(|| DomainError::validation("parent", "Invalid parent comment."))?;
            ensure_parent_matches(article.id, &parent.comment)?;
        }

        let record = self
            .writer
            .create_comment(CreateCommentParams {
                id: Uuid::new_v4(),
                article_id: article.id,
                author_id: principal.user_id,
                parent_id: cmd.parent_id,
                content,
                created_at: OffsetDateTime::now_utc(),
            })
            .await?;

        info!(
            comment_id = %record.id,
            article_id = %record.article_id,
            is_reply = record.is_reply(),
            "Comment created"
        );
        counter!("content_hub_comments_created_total").increment(1);
        self.trigger
            .comment_upserted(record.id, record.article_id, record.parent_id)
            .await;

        Ok(CommentWithAuthor {
            comment: record,
            author: principal_summary(principal),
        })
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        content: &str,
    ) -> Result<CommentWithAuthor, CommentError> {
        let content = normalize_content(content)?;
        let current = self.owned_comment(principal, Visibility::Active, id).await?;

        let record = self
            .writer
            .update_comment_content(current.id, &content, OffsetDateTime::now_utc())
            .await?;
        self.trigger
            .comment_upserted(record.id, record.article_id, record.parent_id)
            .await;

        Ok(CommentWithAuthor {
            comment: record,
            author: principal_summary(principal),
        })
    }

    pub async fn soft_delete(&self, principal: &Principal, id: Uuid) -> Result<(), CommentError> {
        let mut comment = self.owned_comment(principal, Visibility::Active, id).await?;
        comment.soft_delete(OffsetDateTime::now_utc());

        let record = self
            .writer
            .set_comment_deletion(comment.id, comment.deletion, comment.timestamps.updated_at)
            .await?;
        info!(comment_id = %record.id, "Comment soft-deleted");
        self.trigger
            .comment_deleted(record.id, record.article_id, record.parent_id)
            .await;
        Ok(())
    }

    pub async fn restore(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<CommentWithAuthor, CommentError> {
        let mut comment = self.owned_comment(principal, Visibility::All, id).await?;
        comment.restore(OffsetDateTime::now_utc());

        let record = self
            .writer
            .set_comment_deletion(comment.id, comment.deletion, comment.timestamps.updated_at)
            .await?;
        info!(comment_id = %record.id, "Comment restored");
        self.trigger
            .comment_upserted(record.id, record.article_id, record.parent_id)
            .await;

        Ok(CommentWithAuthor {
            comment: record,
            author: principal_summary(principal),
        })
    }

    /// Replies shown under `id`; empty when `id` is itself a reply.
    pub async fn replies(&self, id: Uuid) -> Result<Vec<CommentWithAuthor>, CommentError> {
        Ok(self.retrieve(id).await?.replies)
    }

    async fn owned_comment(
        &self,
        principal: &Principal,
        visibility: Visibility,
        id: Uuid,
    ) -> Result<CommentRecord, CommentError> {
        let found = self
            .reader
            .find_comment(visibility, id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment"))?;
        if found.comment.author_id != principal.user_id {
            // Deleted comments of other users stay invisible.
            if !found.comment.is_active() {
                return Err(DomainError::not_found("comment").into());
            }
            return Err(CommentError::Forbidden);
        }
        Ok(found.comment)
    }

    async fn article_for_comment(&self, article_id: Uuid) -> Result<ArticleRecord, CommentError> {
        let key = CacheKey::ArticleById(article_id);
        let ticket = self.cache.read_ticket();
        if let Some(article) = self.cache.get_json::<ArticleRecord>(&key).await
            && article.is_active()
        {
            return Ok(article);
        }

        let article = self
            .articles
            .find_by_id(ArticleScope::View(Visibility::Active), article_id)
            .await?
            .ok_or_else(|| DomainError::validation("article", "Invalid article."))?;

        let ttl = self.cache.config().article_ttl();
        let depends_on: HashSet<EntityKey> =
            [EntityKey::Article(article_id)].into_iter().collect();
        self.cache
            .put_json(key, &article, ttl, depends_on, ticket)
            .await;
        Ok(article)
    }
}

fn principal_summary(principal: &Principal) -> AuthorSummary {
    AuthorSummary {
        id: principal.user_id,
        username: principal.username.clone(),
    }
}

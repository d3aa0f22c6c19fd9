//! Article reads and writes.
//!
//! Every write calls the cache trigger once it has committed. Reads go through
//! the cache where an entry exists and re-check the caller's visibility on
//! every hit, so an entry populated for an author never leaks a draft.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::comments::{CommentThread, load_threads};
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    ARTICLE_SLUG_CONSTRAINT, ArticleOrdering, ArticleQueryFilter, ArticleStatistics,
    ArticleSummary, ArticlesRepo, ArticlesWriteRepo, CommentsRepo, CreateArticleParams,
    RepoError, UpdateArticleParams, UsersRepo,
};
use crate::application::users::Principal;
use crate::cache::{CacheKey, CacheStore, CacheTrigger, EntityKey, hash_article_list_key};
use crate::domain::articles::{
    DUPLICATE_TITLE_MESSAGE, join_tags, normalize_tags_text, normalize_title, resolve_excerpt,
    validate_content,
};
use crate::domain::entities::ArticleRecord;
use crate::domain::error::DomainError;
use crate::domain::lifecycle::SoftDeletable;
use crate::domain::slug::{derive_slug_or_fallback, next_available_slug};
use crate::domain::visibility::{ArticleScope, Visibility};

/// Inserts retried when a concurrent writer claims the probed slug first.
const SLUG_ATTEMPTS: usize = 5;

const METRIC_ARTICLE_VIEWS: &str = "content_hub_article_views_total";

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("only the author may modify this article")]
    Forbidden,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct CreateArticleCommand {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub is_published: Option<bool>,
    pub tags: Option<String>,
    /// Takes precedence over `tags` when both are present.
    pub tags_list: Option<Vec<String>>,
}

/// Partial update. The slug is never part of an update.
#[derive(Debug, Clone, Default)]
pub struct UpdateArticleCommand {
    pub title: Option<String>,
    pub content: Option<String>,
    /// A blank excerpt re-derives one from the content.
    pub excerpt: Option<String>,
    pub is_published: Option<bool>,
    pub tags: Option<String>,
    pub tags_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub id: Uuid,
    pub username: String,
    /// Active, published articles by this author.
    pub articles_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDetail {
    pub article: ArticleRecord,
    pub author: AuthorProfile,
    /// First page of active top-level comments, newest first.
    pub comments: Vec<CommentThread>,
    pub comments_count: u64,
}

#[derive(Clone)]
pub struct ArticleService {
    reader: Arc<dyn ArticlesRepo>,
    writer: Arc<dyn ArticlesWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
    users: Arc<dyn UsersRepo>,
    cache: Arc<CacheStore>,
    trigger: Arc<CacheTrigger>,
}

impl ArticleService {
    pub fn new(
        reader: Arc<dyn ArticlesRepo>,
        writer: Arc<dyn ArticlesWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
        users: Arc<dyn UsersRepo>,
        cache: Arc<CacheStore>,
        trigger: Arc<CacheTrigger>,
    ) -> Self {
        Self {
            reader,
            writer,
            comments,
            users,
            cache,
            trigger,
        }
    }

    /// Published articles plus the viewer's own active ones.
    ///
    /// Anonymous listings are cached and tracked against the article index.
    pub async fn list(
        &self,
        viewer: Option<&Principal>,
        filter: &ArticleQueryFilter,
        ordering: ArticleOrdering,
        page: PageRequest,
    ) -> Result<Page<ArticleSummary>, ArticleError> {
        let scope = ArticleScope::for_viewer(viewer.map(|p| p.user_id));
        if viewer.is_some() {
            return Ok(self
                .reader
                .list_articles(scope, filter, ordering, page)
                .await?);
        }

        let key = CacheKey::ArticleList {
            filter_hash: hash_article_list_key(filter, ordering, page),
        };
        let ticket = self.cache.read_ticket();
        if let Some(cached) = self.cache.get_json::<Page<ArticleSummary>>(&key).await {
            return Ok(cached);
        }

        let listing = self
            .reader
            .list_articles(scope, filter, ordering, page)
            .await?;
        self.cache
            .put_json(
                key,
                &listing,
                self.cache.config().article_ttl(),
                [EntityKey::ArticlesIndex].into_iter().collect(),
                ticket,
            )
            .await;
        Ok(listing)
    }

    /// The caller's own active articles, newest first.
    pub async fn mine(
        &self,
        principal: &Principal,
        page: PageRequest,
    ) -> Result<Page<ArticleSummary>, ArticleError> {
        Ok(self
            .reader
            .list_articles(
                ArticleScope::AuthoredBy {
                    author: principal.user_id,
                },
                &ArticleQueryFilter::default(),
                ArticleOrdering::default(),
                page,
            )
            .await?)
    }

    /// Load one article, count the view and return the refreshed detail.
    pub async fn retrieve(
        &self,
        viewer: Option<&Principal>,
        slug: &str,
    ) -> Result<ArticleDetail, ArticleError> {
        let scope = ArticleScope::for_viewer(viewer.map(|p| p.user_id));
        let mut article = self.load_visible(scope, slug).await?;

        // Increment in storage, then refresh from the value storage returned.
        article.views_count = self.writer.increment_views(article.id).await?;
        counter!(METRIC_ARTICLE_VIEWS).increment(1);

        let author = self.author_profile(article.author_id).await?;
        let comments = self
            .top_level_threads(article.id, PageRequest::default())
            .await?
            .items;
        let comments_count = self.comments.count_active_for_article(article.id).await?;

        Ok(ArticleDetail {
            article,
            author,
            comments,
            comments_count,
        })
    }

    /// Top-level comments of a visible article, each with up to five replies.
    pub async fn comments(
        &self,
        viewer: Option<&Principal>,
        slug: &str,
        page: PageRequest,
    ) -> Result<Page<CommentThread>, ArticleError> {
        let scope = ArticleScope::for_viewer(viewer.map(|p| p.user_id));
        let article = self.load_visible(scope, slug).await?;
        self.top_level_threads(article.id, page).await
    }

    pub async fn create(
        &self,
        principal: &Principal,
        cmd: CreateArticleCommand,
    ) -> Result<ArticleRecord, ArticleError> {
        let title = normalize_title(&cmd.title)?;
        validate_content(&cmd.content)?;
        let excerpt = resolve_excerpt(cmd.excerpt.as_deref(), &cmd.content)?;
        let tags = resolve_tags(cmd.tags.as_deref(), cmd.tags_list.as_deref())?.unwrap_or_default();
        self.ensure_title_available(&title, None).await?;

        let id = Uuid::new_v4();
        let base = derive_slug_or_fallback(&title, id);
        let now = OffsetDateTime::now_utc();

        for attempt in 1..=SLUG_ATTEMPTS {
            let taken = self.reader.slugs_with_base(&base).await?;
            let slug = next_available_slug(&base, &taken);

            let params = CreateArticleParams {
                id,
                title: title.clone(),
                slug: slug.clone(),
                content: cmd.content.clone(),
                excerpt: excerpt.clone(),
                author_id: principal.user_id,
                is_published: cmd.is_published.unwrap_or(true),
                tags: tags.clone(),
                created_at: now,
            };

            match self.writer.create_article(params).await {
                Ok(article) => {
                    info!(
                        article_id = %article.id,
                        slug = %article.slug,
                        author_id = %article.author_id,
                        "Article created"
                    );
                    self.trigger
                        .article_upserted(article.id, &article.slug, article.author_id)
                        .await;
                    return Ok(article);
                }
                Err(err) if err.is_duplicate_of(ARTICLE_SLUG_CONSTRAINT) => {
                    warn!(attempt, slug = %slug, "Slug claimed concurrently; probing again");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(DomainError::invariant(format!(
            "could not allocate a unique slug for base `{base}`"
        ))
        .into())
    }

    pub async fn update(
        &self,
        principal: &Principal,
        slug: &str,
        cmd: UpdateArticleCommand,
    ) -> Result<ArticleRecord, ArticleError> {
        let current = self.owned_article(principal, slug).await?;

        let title = match cmd.title.as_deref() {
            Some(title) => {
                let title = normalize_title(title)?;
                self.ensure_title_available(&title, Some(current.id)).await?;
                title
            }
            None => current.title.clone(),
        };
        let content = match cmd.content {
            Some(content) => {
                validate_content(&content)?;
                content
            }
            None => current.content.clone(),
        };
        let excerpt = match cmd.excerpt.as_deref() {
            Some(excerpt) => resolve_excerpt(Some(excerpt), &content)?,
            None => resolve_excerpt(Some(&current.excerpt), &content)?,
        };
        let tags = resolve_tags(cmd.tags.as_deref(), cmd.tags_list.as_deref())?
            .unwrap_or_else(|| current.tags.clone());

        let article = self
            .writer
            .update_article(UpdateArticleParams {
                id: current.id,
                title,
                content,
                excerpt,
                is_published: cmd.is_published.unwrap_or(current.is_published),
                tags,
                updated_at: OffsetDateTime::now_utc(),
            })
            .await?;

        info!(article_id = %article.id, slug = %article.slug, "Article updated");
        self.trigger
            .article_upserted(article.id, &article.slug, article.author_id)
            .await;
        Ok(article)
    }

    pub async fn soft_delete(&self, principal: &Principal, slug: &str) -> Result<(), ArticleError> {
        let mut article = self.owned_article(principal, slug).await?;
        article.soft_delete(OffsetDateTime::now_utc());

        let stored = self
            .writer
            .set_article_deletion(article.id, article.deletion, article.timestamps.updated_at)
            .await?;
        info!(article_id = %stored.id, slug = %stored.slug, "Article soft-deleted");
        self.trigger
            .article_deleted(stored.id, &stored.slug, stored.author_id)
            .await;
        Ok(())
    }

    /// Clear the deletion flag. Looks through every article, deleted or not.
    pub async fn restore(
        &self,
        principal: &Principal,
        slug: &str,
    ) -> Result<ArticleRecord, ArticleError> {
        let mut article = self
            .reader
            .find_by_slug(ArticleScope::View(Visibility::All), slug)
            .await?
            .ok_or_else(|| DomainError::not_found("article"))?;

        if article.author_id != principal.user_id {
            return if ArticleScope::for_viewer(Some(principal.user_id)).admits(&article) {
                Err(ArticleError::Forbidden)
            } else {
                Err(DomainError::not_found("article").into())
            };
        }
        if article.is_active() {
            return Ok(article);
        }
        self.ensure_title_available(&article.title, Some(article.id))
            .await?;

        article.restore(OffsetDateTime::now_utc());
        let stored = self
            .writer
            .set_article_deletion(article.id, article.deletion, article.timestamps.updated_at)
            .await?;
        info!(article_id = %stored.id, slug = %stored.slug, "Article restored");
        self.trigger
            .article_upserted(stored.id, &stored.slug, stored.author_id)
            .await;
        Ok(stored)
    }

    pub async fn statistics(&self) -> Result<ArticleStatistics, ArticleError> {
        let key = CacheKey::Statistics;
        let ticket = self.cache.read_ticket();
        if let Some(cached) = self.cache.get_json::<ArticleStatistics>(&key).await {
            return Ok(cached);
        }

        let stats = self.reader.statistics().await?;
        self.cache
            .put_json(
                key,
                &stats,
                self.cache.config().statistics_ttl(),
                [EntityKey::ArticlesIndex].into_iter().collect(),
                ticket,
            )
            .await;
        Ok(stats)
    }

    pub async fn author_profile(&self, author_id: Uuid) -> Result<AuthorProfile, ArticleError> {
        let author = self
            .users
            .find_user(author_id)
            .await?
            .ok_or_else(|| DomainError::invariant(format!("author {author_id} is missing")))?;

        let key = CacheKey::AuthorArticlesCount(author_id);
        let ticket = self.cache.read_ticket();
        let articles_count = match self.cache.get_json::<u64>(&key).await {
            Some(count) => count,
            None => {
                let count = self.reader.count_published_by_author(author_id).await?;
                self.cache
                    .put_json(
                        key,
                        &count,
                        self.cache.config().author_count_ttl(),
                        [EntityKey::Author(author_id)].into_iter().collect(),
                        ticket,
                    )
                    .await;
                count
            }
        };

        Ok(AuthorProfile {
            id: author.id,
            username: author.username,
            articles_count,
        })
    }

    async fn load_visible(
        &self,
        scope: ArticleScope,
        slug: &str,
    ) -> Result<ArticleRecord, ArticleError> {
        let key = CacheKey::ArticleBySlug(slug.to_string());
        let ticket = self.cache.read_ticket();
        if let Some(cached) = self.cache.get_json::<ArticleRecord>(&key).await
            && scope.admits(&cached)
        {
            return Ok(cached);
        }

        let article = self
            .reader
            .find_by_slug(scope, slug)
            .await?
            .ok_or_else(|| DomainError::not_found("article"))?;

        let depends_on: HashSet<EntityKey> = [
            EntityKey::Article(article.id),
            EntityKey::ArticleSlug(article.slug.clone()),
        ]
        .into_iter()
        .collect();
        self.cache
            .put_json(
                key,
                &article,
                self.cache.config().article_ttl(),
                depends_on,
                ticket,
            )
            .await;
        Ok(article)
    }

    async fn top_level_threads(
        &self,
        article_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentThread>, ArticleError> {
        // Only the default first page is cached under the article's comments key.
        let cacheable = page == PageRequest::default();
        let key = CacheKey::ArticleComments(article_id);
        let ticket = self.cache.read_ticket();
        if cacheable
            && let Some(cached) = self.cache.get_json::<Page<CommentThread>>(&key).await
        {
            return Ok(cached);
        }

        let roots = self.comments.top_level_comments(article_id, page).await?;
        let total = roots.total;
        let threads = load_threads(self.comments.as_ref(), roots.items).await?;
        let threads = Page::new(threads, page, total);

        if cacheable {
            self.cache
                .put_json(
                    key,
                    &threads,
                    self.cache.config().article_ttl(),
                    [EntityKey::ArticleComments(article_id)].into_iter().collect(),
                    ticket,
                )
                .await;
        }
        Ok(threads)
    }

    /// An article visible to `principal` that `principal` wrote.
    async fn owned_article(
        &self,
        principal: &Principal,
        slug: &str,
    ) -> Result<ArticleRecord, ArticleError> {
        let article = self
            .reader
            .find_by_slug(ArticleScope::for_viewer(Some(principal.user_id)), slug)
            .await?
            .ok_or_else(|| DomainError::not_found("article"))?;
        if article.author_id != principal.user_id {
            return Err(ArticleError::Forbidden);
        }
        Ok(article)
    }

    async fn ensure_title_available(
        &self,
        title: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ArticleError> {
        if self.reader.title_taken(title, exclude).await? {
            return Err(DomainError::validation("title", DUPLICATE_TITLE_MESSAGE).into());
        }
        Ok(())
    }
}

/// `tags_list` wins over `tags`; `None` when neither was supplied.
fn resolve_tags(
    tags: Option<&str>,
    tags_list: Option<&[String]>,
) -> Result<Option<String>, DomainError> {
    match (tags_list, tags) {
        (Some(list), _) => join_tags(list).map(Some),
        (None, Some(text)) => normalize_tags_text(text).map(Some),
        (None, None) => Ok(None),
    }
}

//! In-memory fixtures shared by the integration tests.

#![allow(dead_code)]

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use content_hub::application::articles::{ArticleService, CreateArticleCommand};
use content_hub::application::comments::{CommentService, CreateCommentCommand};
use content_hub::application::pagination::{Page, PageLimits, PageRequest};
use content_hub::application::repos::{
    ARTICLE_SLUG_CONSTRAINT, ArticleOrdering, ArticleQueryFilter, ArticleSortField,
    ArticleStatistics, ArticleSummary, ArticlesRepo, ArticlesWriteRepo, AuthorArticleCount,
    CommentQueryFilter, CommentWithAuthor, CommentsRepo, CommentsWriteRepo, CreateArticleParams,
    CreateCommentParams, CreateUserParams, EMAIL_CONSTRAINT, RepoError, SortDirection,
    StorageHealth, USERNAME_CONSTRAINT, UpdateArticleParams, UpdateProfileParams, UserActivity,
    UsersRepo, UsersWriteRepo,
};
use content_hub::application::users::{IssuedToken, Principal, RegisterUserCommand, UserService};
use content_hub::cache::{CacheBackend, CacheConfig, CacheError, CacheHandles};
use content_hub::domain::entities::{
    ArticleRecord, AuthorSummary, CommentRecord, SoftDeleteState, Timestamps, UserRecord,
};
use content_hub::domain::slug::belongs_to_base;
use content_hub::domain::visibility::{ArticleScope, Visibility};
use content_hub::infra::http::{ApiRateLimiter, ApiState, HealthState, RouterState};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    articles: HashMap<Uuid, ArticleRecord>,
    comments: HashMap<Uuid, CommentRecord>,
}

impl Tables {
    fn author(&self, id: Uuid) -> Result<AuthorSummary, RepoError> {
        self.users
            .get(&id)
            .map(|user| AuthorSummary {
                id: user.id,
                username: user.username.clone(),
            })
            .ok_or_else(|| RepoError::Integrity {
                message: format!("author {id} missing"),
            })
    }

    fn with_author(&self, comment: &CommentRecord) -> Result<CommentWithAuthor, RepoError> {
        Ok(CommentWithAuthor {
            comment: comment.clone(),
            author: self.author(comment.author_id)?,
        })
    }

    fn active_comments_for(&self, article_id: Uuid) -> u64 {
        self.comments
            .values()
            .filter(|c| c.article_id == article_id && !c.deletion.is_deleted)
            .count() as u64
    }

    fn username_of(&self, id: Uuid) -> String {
        self.users
            .get(&id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }
}

fn icontains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn newest_first(a: &CommentRecord, b: &CommentRecord) -> CmpOrdering {
    b.timestamps
        .created_at
        .cmp(&a.timestamps.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Storage double honouring the same views and constraints as Postgres.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    down: AtomicBool,
    pub view_increments: AtomicUsize,
    /// Number of upcoming `create_article` calls that report a slug clash.
    pub slug_conflicts: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("connection refused".to_string()));
        }
        Ok(())
    }

    pub async fn article(&self, id: Uuid) -> Option<ArticleRecord> {
        self.tables.lock().await.articles.get(&id).cloned()
    }

    pub async fn comment(&self, id: Uuid) -> Option<CommentRecord> {
        self.tables.lock().await.comments.get(&id).cloned()
    }

    /// Insert a comment directly, bypassing service validation.
    pub async fn insert_comment(&self, record: CommentRecord) {
        self.tables
            .lock()
            .await
            .comments
            .insert(record.id, record);
    }

    /// Overwrite stored columns behind the services' back.
    pub async fn edit_article<F>(&self, id: Uuid, edit: F)
    where
        F: FnOnce(&mut ArticleRecord),
    {
        if let Some(article) = self.tables.lock().await.articles.get_mut(&id) {
            edit(article);
        }
    }
}

#[async_trait]
impl ArticlesRepo for InMemoryStore {
    async fn list_articles(
        &self,
        scope: ArticleScope,
        filter: &ArticleQueryFilter,
        ordering: ArticleOrdering,
        page: PageRequest,
    ) -> Result<Page<ArticleSummary>, RepoError> {
        self.check()?;
        let tables = self.tables.lock().await;

        let mut matching: Vec<&ArticleRecord> = tables
            .articles
            .values()
            .filter(|a| scope.admits(a))
            .filter(|a| {
                let username = tables.username_of(a.author_id);
                filter.title.as_deref().is_none_or(|t| icontains(&a.title, t))
                    && filter.author.as_deref().is_none_or(|u| icontains(&username, u))
                    && filter.tags.as_deref().is_none_or(|t| icontains(&a.tags, t))
                    && filter
                        .created_after
                        .is_none_or(|at| a.timestamps.created_at >= at)
                    && filter
                        .created_before
                        .is_none_or(|at| a.timestamps.created_at <= at)
                    && filter.is_published.is_none_or(|p| a.is_published == p)
                    && filter.min_views.is_none_or(|v| a.views_count >= v)
                    && filter.search.as_deref().is_none_or(|s| {
                        icontains(&a.title, s)
                            || icontains(&a.content, s)
                            || icontains(&a.tags, s)
                            || icontains(&username, s)
                    })
            })
            .collect();

        matching.sort_by(|a, b| {
            let primary = match ordering.field {
                ArticleSortField::CreatedAt => a.timestamps.created_at.cmp(&b.timestamps.created_at),
                ArticleSortField::UpdatedAt => a.timestamps.updated_at.cmp(&b.timestamps.updated_at),
                ArticleSortField::ViewsCount => a.views_count.cmp(&b.views_count),
                ArticleSortField::Title => a.title.cmp(&b.title),
            }
            .then_with(|| a.id.cmp(&b.id));
            match ordering.direction {
                SortDirection::Asc => primary,
                SortDirection::Desc => primary.reverse(),
            }
        });

        let summaries = matching
            .into_iter()
            .map(|article| {
                Ok(ArticleSummary {
                    article: article.clone(),
                    author: tables.author(article.author_id)?,
                    comments_count: tables.active_comments_for(article.id),
                })
            })
            .collect::<Result<Vec<_>, RepoError>>()?;

        Ok(Page::from_vec(summaries, page))
    }

    async fn find_by_slug(
        &self,
        scope: ArticleScope,
        slug: &str,
    ) -> Result<Option<ArticleRecord>, RepoError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .articles
            .values()
            .find(|a| a.slug == slug && scope.admits(a))
            .cloned())
    }

    async fn find_by_id(
        &self,
        scope: ArticleScope,
        id: Uuid,
    ) -> Result<Option<ArticleRecord>, RepoError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .articles
            .get(&id)
            .filter(|a| scope.admits(a))
            .cloned())
    }

    async fn slugs_with_base(&self, base: &str) -> Result<HashSet<String>, RepoError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .articles
            .values()
            .filter(|a| belongs_to_base(&a.slug, base))
            .map(|a| a.slug.clone())
            .collect())
    }

    async fn title_taken(&self, title: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
        self.check()?;
        let tables = self.tables.lock().await;
        let lowered = title.to_lowercase();
        Ok(tables.articles.values().any(|a| {
            !a.deletion.is_deleted && Some(a.id) != exclude && a.title.to_lowercase() == lowered
        }))
    }

    async fn count_published_by_author(&self, author_id: Uuid) -> Result<u64, RepoError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .articles
            .values()
            .filter(|a| a.author_id == author_id && Visibility::Published.admits(*a))
            .count() as u64)
    }

    async fn statistics(&self) -> Result<ArticleStatistics, RepoError> {
        self.check()?;
        let tables = self.tables.lock().await;
        let active: Vec<&ArticleRecord> = tables
            .articles
            .values()
            .filter(|a| !a.deletion.is_deleted)
            .collect();
        let published: Vec<&ArticleRecord> =
            active.iter().copied().filter(|a| a.is_published).collect();

        let mut per_author: HashMap<String, u64> = HashMap::new();
        for article in &published {
            *per_author
                .entry(tables.username_of(article.author_id))
                .or_default() += 1;
        }
        let mut top_authors: Vec<AuthorArticleCount> = per_author
            .into_iter()
            .map(|(username, article_count)| AuthorArticleCount {
                username,
                article_count,
            })
            .collect();
        top_authors.sort_by(|a, b| {
            b.article_count
                .cmp(&a.article_count)
                .then_with(|| a.username.cmp(&b.username))
        });
        top_authors.truncate(5);

        Ok(ArticleStatistics {
            total_articles: active.len() as u64,
            published_articles: published.len() as u64,
            total_views: published.iter().map(|a| a.views_count).sum(),
            total_comments: tables
                .comments
                .values()
                .filter(|c| !c.deletion.is_deleted)
                .count() as u64,
            top_authors,
        })
    }
}

#[async_trait]
impl ArticlesWriteRepo for InMemoryStore {
    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        self.check()?;
        if self
            .slug_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RepoError::Duplicate {
                constraint: ARTICLE_SLUG_CONSTRAINT.to_string(),
            });
        }

        let mut tables = self.tables.lock().await;
        if tables.articles.values().any(|a| a.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: ARTICLE_SLUG_CONSTRAINT.to_string(),
            });
        }
        if !tables.users.contains_key(&params.author_id) {
            return Err(RepoError::InvalidInput {
                message: "unknown author".to_string(),
            });
        }

        let record = ArticleRecord {
            id: params.id,
            title: params.title,
            slug: params.slug,
            content: params.content,
            excerpt: params.excerpt,
            author_id: params.author_id,
            is_published: params.is_published,
            views_count: 0,
            tags: params.tags,
            timestamps: Timestamps::new(params.created_at),
            deletion: SoftDeleteState::active(),
        };
        tables.articles.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_article(
        &self,
        params: UpdateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let article = tables
            .articles
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        article.title = params.title;
        article.content = params.content;
        article.excerpt = params.excerpt;
        article.is_published = params.is_published;
        article.tags = params.tags;
        article.timestamps.touch(params.updated_at);
        Ok(article.clone())
    }

    async fn set_article_deletion(
        &self,
        id: Uuid,
        state: SoftDeleteState,
        updated_at: OffsetDateTime,
    ) -> Result<ArticleRecord, RepoError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let article = tables.articles.get_mut(&id).ok_or(RepoError::NotFound)?;
        article.deletion = state;
        article.timestamps.touch(updated_at);
        Ok(article.clone())
    }

    async fn increment_views(&self, id: Uuid) -> Result<i64, RepoError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let article = tables.articles.get_mut(&id).ok_or(RepoError::NotFound)?;
        article.views_count += 1;
        self.view_increments.fetch_add(1, Ordering::SeqCst);
        Ok(article.views_count)
    }
}

#[async_trait]
impl CommentsRepo for InMemoryStore {
    async fn list_comments(
        &self,
        visibility: Visibility,
        filter: &CommentQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CommentWithAuthor>, RepoError> {
        self.check()?;
        let tables = self.tables.lock().await;
        let mut matching: Vec<&CommentRecord> = tables
            .comments
            .values()
            .filter(|c| visibility.admits(*c))
            .filter(|c| {
                let slug = tables.articles.get(&c.article_id).map(|a| a.slug.as_str());
                filter.article_id.is_none_or(|id| c.article_id == id)
                    && filter
                        .article_slug
                        .as_deref()
                        .is_none_or(|s| slug == Some(s))
                    && filter
                        .author
                        .as_deref()
                        .is_none_or(|u| icontains(&tables.username_of(c.author_id), u))
                    && filter.author_id.is_none_or(|id| c.author_id == id)
                    && filter
                        .created_after
                        .is_none_or(|at| c.timestamps.created_at >= at)
                    && filter
                        .created_before
                        .is_none_or(|at| c.timestamps.created_at <= at)
                    && filter.is_reply.is_none_or(|r| c.is_reply() == r)
            })
            .collect();
        matching.sort_by(|a, b| newest_first(a, b));

        let items = matching
            .into_iter()
            .map(|c| tables.with_author(c))
            .collect::<Result<Vec<_>, RepoError>>()?;
        Ok(Page::from_vec(items, page))
    }

    async fn find_comment(
        &self,
        visibility: Visibility,
        id: Uuid,
    ) -> Result<Option<CommentWithAuthor>, RepoError> {
        self.check()?;
        let tables = self.tables.lock().await;
        tables
            .comments
            .get(&id)
            .filter(|c| visibility.admits(*c))
            .map(|c| tables.with_author(c))
            .transpose()
    }

    async fn top_level_comments(
        &self,
        article_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentWithAuthor>, RepoError> {
        let filter = CommentQueryFilter {
            article_id: Some(article_id),
            is_reply: Some(false),
            ..CommentQueryFilter::default()
        };
        self.list_comments(Visibility::Active, &filter, page).await
    }

    async fn replies_for(
        &self,
        parent_ids: &[Uuid],
        per_parent: usize,
    ) -> Result<Vec<CommentWithAuthor>, RepoError> {
        self.check()?;
        let tables = self.tables.lock().await;
        let mut out = Vec::new();
        for parent_id in parent_ids {
            let mut children: Vec<&CommentRecord> = tables
                .comments
                .values()
                .filter(|c| c.parent_id == Some(*parent_id) && !c.deletion.is_deleted)
                .collect();
            children.sort_by(|a, b| newest_first(a, b));
            for child in children.into_iter().take(per_parent) {
                out.push(tables.with_author(child)?);
            }
        }
        Ok(out)
    }

    async fn count_active_for_article(&self, article_id: Uuid) -> Result<u64, RepoError> {
        self.check()?;
        Ok(self.tables.lock().await.active_comments_for(article_id))
    }
}

#[async_trait]
impl CommentsWriteRepo for InMemoryStore {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        if !tables.articles.contains_key(&params.article_id) {
            return Err(RepoError::InvalidInput {
                message: "unknown article".to_string(),
            });
        }
        let record = CommentRecord {
            id: params.id,
            article_id: params.article_id,
            author_id: params.author_id,
            parent_id: params.parent_id,
            content: params.content,
            timestamps: Timestamps::new(params.created_at),
            deletion: SoftDeleteState::active(),
        };
        tables.comments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_comment_content(
        &self,
        id: Uuid,
        content: &str,
        updated_at: OffsetDateTime,
    ) -> Result<CommentRecord, RepoError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let comment = tables.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
        comment.content = content.to_string();
        comment.timestamps.touch(updated_at);
        Ok(comment.clone())
    }

    async fn set_comment_deletion(
        &self,
        id: Uuid,
        state: SoftDeleteState,
        updated_at: OffsetDateTime,
    ) -> Result<CommentRecord, RepoError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let comment = tables.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
        comment.deletion = state;
        comment.timestamps.touch(updated_at);
        Ok(comment.clone())
    }
}

#[async_trait]
impl UsersRepo for InMemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        self.check()?;
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_token_prefix(&self, prefix: &str) -> Result<Option<UserRecord>, RepoError> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|u| u.token_prefix == prefix)
            .cloned())
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<UserRecord>, RepoError> {
        self.check()?;
        let mut users: Vec<UserRecord> =
            self.tables.lock().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(Page::from_vec(users, page))
    }

    async fn activity(&self, id: Uuid) -> Result<UserActivity, RepoError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(UserActivity {
            articles_count: tables
                .articles
                .values()
                .filter(|a| a.author_id == id && Visibility::Published.admits(*a))
                .count() as u64,
            comments_count: tables
                .comments
                .values()
                .filter(|c| c.author_id == id && !c.deletion.is_deleted)
                .count() as u64,
        })
    }
}

#[async_trait]
impl UsersWriteRepo for InMemoryStore {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: USERNAME_CONSTRAINT.to_string(),
            });
        }
        if tables.users.values().any(|u| u.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: EMAIL_CONSTRAINT.to_string(),
            });
        }
        let record = UserRecord {
            id: params.id,
            username: params.username,
            email: params.email,
            first_name: params.first_name,
            last_name: params.last_name,
            token_prefix: params.token_prefix,
            token_hash: params.token_hash,
            date_joined: params.date_joined,
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        if tables
            .users
            .values()
            .any(|u| u.id != params.id && u.email == params.email)
        {
            return Err(RepoError::Duplicate {
                constraint: EMAIL_CONSTRAINT.to_string(),
            });
        }
        let user = tables.users.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        user.email = params.email;
        user.first_name = params.first_name;
        user.last_name = params.last_name;
        Ok(user.clone())
    }

    async fn replace_token(
        &self,
        id: Uuid,
        token_prefix: &str,
        token_hash: &[u8],
    ) -> Result<UserRecord, RepoError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let user = tables.users.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.token_prefix = token_prefix.to_string();
        user.token_hash = token_hash.to_vec();
        Ok(user.clone())
    }
}

#[async_trait]
impl StorageHealth for InMemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        self.check()
    }
}

/// Backend whose every operation fails, as an unreachable Redis would.
#[derive(Default)]
pub struct BrokenCache {
    pub calls: AtomicUsize,
}

impl BrokenCache {
    fn fail(&self) -> CacheError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CacheError::backend("broken", "connection reset by peer")
    }
}

#[async_trait]
impl CacheBackend for BrokenCache {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(self.fail())
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(self.fail())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(self.fail())
    }

    async fn track(
        &self,
        _key: &str,
        _entities: &[String],
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(self.fail())
    }

    async fn tracked(&self, _entity: &str) -> Result<Vec<String>, CacheError> {
        Err(self.fail())
    }

    async fn take_tracked(&self, _entity: &str) -> Result<Vec<String>, CacheError> {
        Err(self.fail())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(self.fail())
    }
}

/// Services wired over one in-memory store and cache.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub cache: CacheHandles,
    pub articles: Arc<ArticleService>,
    pub comments: Arc<CommentService>,
    pub users: Arc<UserService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_cache(CacheHandles::in_memory(CacheConfig::default()))
    }

    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_cache(CacheHandles::new(CacheConfig::default(), backend))
    }

    pub fn with_cache(cache: CacheHandles) -> Self {
        let store = InMemoryStore::new();
        let state = ApiState::from_repositories(
            store.clone(),
            &cache,
            Arc::new(ApiRateLimiter::new(Duration::from_secs(60), 1_000)),
            PageLimits::default(),
        );
        Self {
            store,
            cache,
            articles: state.articles,
            comments: state.comments,
            users: state.users,
        }
    }

    /// Router state over the same store, with a custom rate limiter.
    pub fn router_state(&self, rate_limiter: Arc<ApiRateLimiter>) -> RouterState {
        RouterState {
            api: ApiState::from_repositories(
                self.store.clone(),
                &self.cache,
                rate_limiter,
                PageLimits::default(),
            ),
            health: HealthState {
                storage: self.store.clone(),
                cache: self.cache.store.clone(),
            },
        }
    }

    pub async fn register(&self, username: &str) -> (Principal, IssuedToken) {
        let issued = self
            .users
            .register(RegisterUserCommand {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: None,
                last_name: None,
            })
            .await
            .expect("register user");
        let principal = Principal {
            user_id: issued.profile.id,
            username: issued.profile.username.clone(),
        };
        (principal, issued)
    }

    pub async fn user(&self, username: &str) -> Principal {
        self.register(username).await.0
    }

    pub async fn publish(&self, author: &Principal, title: &str) -> ArticleRecord {
        self.articles
            .create(author, article_command(title, true))
            .await
            .expect("create article")
    }

    pub async fn draft(&self, author: &Principal, title: &str) -> ArticleRecord {
        self.articles
            .create(author, article_command(title, false))
            .await
            .expect("create draft")
    }

    pub async fn comment(
        &self,
        author: &Principal,
        article_id: Uuid,
        parent_id: Option<Uuid>,
        content: &str,
    ) -> CommentWithAuthor {
        self.comments
            .create(
                author,
                CreateCommentCommand {
                    article_id,
                    content: content.to_string(),
                    parent_id,
                },
            )
            .await
            .expect("create comment")
    }
}

pub fn article_command(title: &str, is_published: bool) -> CreateArticleCommand {
    CreateArticleCommand {
        title: title.to_string(),
        content: format!("{title} has a body that is long enough to pass validation."),
        excerpt: None,
        is_published: Some(is_published),
        tags: None,
        tags_list: None,
    }
}

/// A stored comment with a fixed creation instant, for ordering tests.
pub fn comment_at(
    article_id: Uuid,
    author_id: Uuid,
    parent_id: Option<Uuid>,
    created_at: OffsetDateTime,
) -> CommentRecord {
    CommentRecord {
        id: Uuid::new_v4(),
        article_id,
        author_id,
        parent_id,
        content: "seeded reply".to_string(),
        timestamps: Timestamps::new(created_at),
        deletion: SoftDeleteState::active(),
    }
}

//! Repository traits describing persistence adapters.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{
    ArticleRecord, AuthorSummary, CommentRecord, SoftDeleteState, UserRecord,
};
use crate::domain::visibility::{ArticleScope, Visibility};

pub const ARTICLE_SLUG_CONSTRAINT: &str = "articles_slug_key";
pub const USERNAME_CONSTRAINT: &str = "users_username_key";
pub const EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn is_duplicate_of(&self, constraint: &str) -> bool {
        matches!(self, RepoError::Duplicate { constraint: c } if c == constraint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArticleSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    ViewsCount,
    Title,
}

impl ArticleSortField {
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleSortField::CreatedAt => "created_at",
            ArticleSortField::UpdatedAt => "updated_at",
            ArticleSortField::ViewsCount => "views_count",
            ArticleSortField::Title => "title",
        }
    }
}

/// Ordering parsed from `field` or `-field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArticleOrdering {
    pub field: ArticleSortField,
    pub direction: SortDirection,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported ordering `{0}`")]
pub struct OrderingParseError(pub String);

impl FromStr for ArticleOrdering {
    type Err = OrderingParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let (direction, name) = match trimmed.strip_prefix('-') {
            Some(rest) => (SortDirection::Desc, rest),
            None => (SortDirection::Asc, trimmed),
        };
        let field = match name {
            "created_at" => ArticleSortField::CreatedAt,
            "updated_at" => ArticleSortField::UpdatedAt,
            "views_count" => ArticleSortField::ViewsCount,
            "title" => ArticleSortField::Title,
            _ => return Err(OrderingParseError(raw.to_string())),
        };
        Ok(Self { field, direction })
    }
}

impl fmt::Display for ArticleOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.direction == SortDirection::Desc {
            f.write_str("-")?;
        }
        f.write_str(self.field.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArticleQueryFilter {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    /// Case-insensitive substring of the author's username.
    pub author: Option<String>,
    pub tags: Option<String>,
    pub created_after: Option<OffsetDateTime>,
    pub created_before: Option<OffsetDateTime>,
    pub is_published: Option<bool>,
    pub min_views: Option<i64>,
    /// Matches title, content, tags or author username.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CommentQueryFilter {
    pub article_id: Option<Uuid>,
    pub article_slug: Option<String>,
    pub author: Option<String>,
    pub author_id: Option<Uuid>,
    pub created_after: Option<OffsetDateTime>,
    pub created_before: Option<OffsetDateTime>,
    pub is_reply: Option<bool>,
}

/// Article row joined with the fields list views need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub article: ArticleRecord,
    pub author: AuthorSummary,
    pub comments_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    pub comment: CommentRecord,
    pub author: AuthorSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorArticleCount {
    pub username: String,
    pub article_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleStatistics {
    pub total_articles: u64,
    pub published_articles: u64,
    pub total_views: i64,
    pub total_comments: u64,
    pub top_authors: Vec<AuthorArticleCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserActivity {
    pub articles_count: u64,
    pub comments_count: u64,
}

#[derive(Debug, Clone)]
pub struct CreateArticleParams {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub author_id: Uuid,
    pub is_published: bool,
    pub tags: String,
    pub created_at: OffsetDateTime,
}

/// Full replacement of the mutable article fields. The slug is not here on purpose.
#[derive(Debug, Clone)]
pub struct UpdateArticleParams {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub is_published: bool,
    pub tags: String,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub id: Uuid,
    pub article_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub token_prefix: String,
    pub token_hash: Vec<u8>,
    pub date_joined: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileParams {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    async fn list_articles(
        &self,
        scope: ArticleScope,
        filter: &ArticleQueryFilter,
        ordering: ArticleOrdering,
        page: PageRequest,
    ) -> Result<Page<ArticleSummary>, RepoError>;

    async fn find_by_slug(
        &self,
        scope: ArticleScope,
        slug: &str,
    ) -> Result<Option<ArticleRecord>, RepoError>;

    async fn find_by_id(
        &self,
        scope: ArticleScope,
        id: Uuid,
    ) -> Result<Option<ArticleRecord>, RepoError>;

    /// Every stored slug equal to `base` or `base-<n>`, deleted rows included.
    async fn slugs_with_base(&self, base: &str) -> Result<HashSet<String>, RepoError>;

    /// Case-insensitive title clash among active articles.
    async fn title_taken(&self, title: &str, exclude: Option<Uuid>) -> Result<bool, RepoError>;

    async fn count_published_by_author(&self, author_id: Uuid) -> Result<u64, RepoError>;

    async fn statistics(&self) -> Result<ArticleStatistics, RepoError>;
}

#[async_trait]
pub trait ArticlesWriteRepo: Send + Sync {
    async fn create_article(&self, params: CreateArticleParams)
    -> Result<ArticleRecord, RepoError>;

    async fn update_article(&self, params: UpdateArticleParams)
    -> Result<ArticleRecord, RepoError>;

    async fn set_article_deletion(
        &self,
        id: Uuid,
        state: SoftDeleteState,
        updated_at: OffsetDateTime,
    ) -> Result<ArticleRecord, RepoError>;

    /// Atomically add one view in storage and return the stored count.
    async fn increment_views(&self, id: Uuid) -> Result<i64, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments matching `filter`, newest first.
    async fn list_comments(
        &self,
        visibility: Visibility,
        filter: &CommentQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CommentWithAuthor>, RepoError>;

    async fn find_comment(
        &self,
        visibility: Visibility,
        id: Uuid,
    ) -> Result<Option<CommentWithAuthor>, RepoError>;

    /// Active comments without a parent, newest first.
    async fn top_level_comments(
        &self,
        article_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentWithAuthor>, RepoError>;

    /// Active direct children of `parent_ids`, at most `per_parent` each, newest first.
    async fn replies_for(
        &self,
        parent_ids: &[Uuid],
        per_parent: usize,
    ) -> Result<Vec<CommentWithAuthor>, RepoError>;

    async fn count_active_for_article(&self, article_id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CommentsWriteRepo: Send + Sync {
    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn update_comment_content(
        &self,
        id: Uuid,
        content: &str,
        updated_at: OffsetDateTime,
    ) -> Result<CommentRecord, RepoError>;

    async fn set_comment_deletion(
        &self,
        id: Uuid,
        state: SoftDeleteState,
        updated_at: OffsetDateTime,
    ) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_token_prefix(&self, prefix: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn list_users(&self, page: PageRequest) -> Result<Page<UserRecord>, RepoError>;

    /// Published active articles and active comments written by the user.
    async fn activity(&self, id: Uuid) -> Result<UserActivity, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError>;

    async fn replace_token(
        &self,
        id: Uuid,
        token_prefix: &str,
        token_hash: &[u8],
    ) -> Result<UserRecord, RepoError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait StorageHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

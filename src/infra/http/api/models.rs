use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::articles::{ArticleDetail, AuthorProfile};
use crate::application::comments::CommentThread;
use crate::application::repos::{ArticleSummary, CommentWithAuthor};
use crate::application::users::{IssuedToken, UserProfile};
use crate::domain::entities::{ArticleRecord, AuthorSummary};

// ----- Requests -----

#[derive(Debug, Deserialize, Serialize)]
pub struct ArticleCreateRequest {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub is_published: Option<bool>,
    pub tags: Option<String>,
    pub tags_list: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ArticleUpdateRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub is_published: Option<bool>,
    pub tags: Option<String>,
    pub tags_list: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentCreateRequest {
    #[serde(alias = "article_id")]
    pub article: Uuid,
    pub content: String,
    #[serde(default, alias = "parent_id")]
    pub parent: Option<Uuid>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentUpdateRequest {
    pub content: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProfileUpdateRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

// ----- Responses -----

#[derive(Debug, Serialize)]
pub struct ArticleView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub is_published: bool,
    pub views_count: i64,
    pub tags: String,
    pub tags_list: Vec<String>,
    pub reading_time: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&ArticleRecord> for ArticleView {
    fn from(article: &ArticleRecord) -> Self {
        Self {
            id: article.id,
            title: article.title.clone(),
            slug: article.slug.clone(),
            content: article.content.clone(),
            excerpt: article.excerpt.clone(),
            is_published: article.is_published,
            views_count: article.views_count,
            tags: article.tags.clone(),
            tags_list: article.tags_list(),
            reading_time: article.reading_time(),
            created_at: article.timestamps.created_at,
            updated_at: article.timestamps.updated_at,
        }
    }
}

/// Response for article writes.
#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    #[serde(flatten)]
    pub article: ArticleView,
    pub author_id: Uuid,
}

impl From<ArticleRecord> for ArticleResponse {
    fn from(article: ArticleRecord) -> Self {
        Self {
            article: ArticleView::from(&article),
            author_id: article.author_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleListItem {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub author: AuthorSummary,
    pub is_published: bool,
    pub views_count: i64,
    pub tags_list: Vec<String>,
    pub reading_time: u32,
    pub comments_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ArticleSummary> for ArticleListItem {
    fn from(summary: ArticleSummary) -> Self {
        let ArticleSummary {
            article,
            author,
            comments_count,
        } = summary;
        Self {
            tags_list: article.tags_list(),
            reading_time: article.reading_time(),
            id: article.id,
            title: article.title,
            slug: article.slug,
            excerpt: article.excerpt,
            author,
            is_published: article.is_published,
            views_count: article.views_count,
            comments_count,
            created_at: article.timestamps.created_at,
            updated_at: article.timestamps.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleDetailResponse {
    #[serde(flatten)]
    pub article: ArticleView,
    pub author: AuthorProfile,
    pub comments: Vec<CommentThreadView>,
    pub comments_count: u64,
}

impl From<ArticleDetail> for ArticleDetailResponse {
    fn from(detail: ArticleDetail) -> Self {
        Self {
            article: ArticleView::from(&detail.article),
            author: detail.author,
            comments: detail
                .comments
                .into_iter()
                .map(CommentThreadView::from)
                .collect(),
            comments_count: detail.comments_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub article: Uuid,
    pub author: AuthorSummary,
    pub parent: Option<Uuid>,
    pub content: String,
    pub is_reply: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<CommentWithAuthor> for CommentView {
    fn from(value: CommentWithAuthor) -> Self {
        let CommentWithAuthor { comment, author } = value;
        Self {
            is_reply: comment.is_reply(),
            id: comment.id,
            article: comment.article_id,
            author,
            parent: comment.parent_id,
            content: comment.content,
            created_at: comment.timestamps.created_at,
            updated_at: comment.timestamps.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentThreadView {
    #[serde(flatten)]
    pub comment: CommentView,
    pub replies: Vec<CommentView>,
}

impl From<CommentThread> for CommentThreadView {
    fn from(thread: CommentThread) -> Self {
        Self {
            comment: CommentView::from(thread.comment),
            replies: thread.replies.into_iter().map(CommentView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user: UserProfile,
    pub token: String,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            user: issued.profile,
            token: issued.token,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub cache: &'static str,
}

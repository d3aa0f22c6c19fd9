use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{ArticleSummary, CommentWithAuthor, RepoError};
use crate::domain::entities::{
    ArticleRecord, AuthorSummary, CommentRecord, SoftDeleteState, Timestamps, UserRecord,
};

use super::util::convert_count;

pub(crate) const ARTICLE_COLUMNS: &str = "a.id, a.title, a.slug, a.content, a.excerpt, \
     a.author_id, a.is_published, a.views_count, a.tags, a.created_at, a.updated_at, \
     a.is_deleted, a.deleted_at";

pub(crate) const COMMENT_COLUMNS: &str = "c.id, c.article_id, c.author_id, c.parent_id, \
     c.content, c.created_at, c.updated_at, c.is_deleted, c.deleted_at";

pub(crate) const USER_COLUMNS: &str = "u.id, u.username, u.email, u.first_name, u.last_name, \
     u.token_prefix, u.token_hash, u.date_joined";

#[derive(sqlx::FromRow)]
pub(crate) struct ArticleRow {
    pub(crate) id: Uuid,
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) content: String,
    pub(crate) excerpt: String,
    pub(crate) author_id: Uuid,
    pub(crate) is_published: bool,
    pub(crate) views_count: i64,
    pub(crate) tags: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
    pub(crate) is_deleted: bool,
    pub(crate) deleted_at: Option<OffsetDateTime>,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            excerpt: row.excerpt,
            author_id: row.author_id,
            is_published: row.is_published,
            views_count: row.views_count,
            tags: row.tags,
            timestamps: Timestamps {
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            deletion: SoftDeleteState {
                is_deleted: row.is_deleted,
                deleted_at: row.deleted_at,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ArticleSummaryRow {
    #[sqlx(flatten)]
    pub(crate) article: ArticleRow,
    pub(crate) author_username: String,
    pub(crate) comments_count: i64,
}

impl TryFrom<ArticleSummaryRow> for ArticleSummary {
    type Error = RepoError;

    fn try_from(row: ArticleSummaryRow) -> Result<Self, Self::Error> {
        let article = ArticleRecord::from(row.article);
        Ok(Self {
            author: AuthorSummary {
                id: article.author_id,
                username: row.author_username,
            },
            comments_count: convert_count(row.comments_count)?,
            article,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommentRow {
    pub(crate) id: Uuid,
    pub(crate) article_id: Uuid,
    pub(crate) author_id: Uuid,
    pub(crate) parent_id: Option<Uuid>,
    pub(crate) content: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
    pub(crate) is_deleted: bool,
    pub(crate) deleted_at: Option<OffsetDateTime>,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            article_id: row.article_id,
            author_id: row.author_id,
            parent_id: row.parent_id,
            content: row.content,
            timestamps: Timestamps {
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            deletion: SoftDeleteState {
                is_deleted: row.is_deleted,
                deleted_at: row.deleted_at,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommentWithAuthorRow {
    #[sqlx(flatten)]
    pub(crate) comment: CommentRow,
    pub(crate) author_username: String,
}

impl From<CommentWithAuthorRow> for CommentWithAuthor {
    fn from(row: CommentWithAuthorRow) -> Self {
        let comment = CommentRecord::from(row.comment);
        Self {
            author: AuthorSummary {
                id: comment.author_id,
                username: row.author_username,
            },
            comment,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) token_prefix: String,
    pub(crate) token_hash: Vec<u8>,
    pub(crate) date_joined: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            token_prefix: row.token_prefix,
            token_hash: row.token_hash,
            date_joined: row.date_joined,
        }
    }
}

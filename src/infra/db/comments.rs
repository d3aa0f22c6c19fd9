use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CommentQueryFilter, CommentWithAuthor, CommentsRepo, CommentsWriteRepo, CreateCommentParams,
    RepoError,
};
use crate::domain::entities::{CommentRecord, SoftDeleteState};
use crate::domain::visibility::Visibility;

use super::PostgresRepositories;
use super::rows::{COMMENT_COLUMNS, CommentRow, CommentWithAuthorRow};
use super::util::{contains_pattern, convert_count, map_sqlx_error};

const COMMENT_FROM: &str = " FROM comments c \
     INNER JOIN users u ON u.id = c.author_id \
     INNER JOIN articles a ON a.id = c.article_id \
     WHERE 1=1";

impl PostgresRepositories {
    fn apply_comment_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CommentQueryFilter) {
        if let Some(article_id) = filter.article_id {
            qb.push(" AND c.article_id = ");
            qb.push_bind(article_id);
        }
        if let Some(slug) = filter.article_slug.as_deref() {
            qb.push(" AND a.slug = ");
            qb.push_bind(slug.to_string());
        }
        if let Some(author) = filter.author.as_deref() {
            qb.push(" AND u.username ILIKE ");
            qb.push_bind(contains_pattern(author));
        }
        if let Some(author_id) = filter.author_id {
            qb.push(" AND c.author_id = ");
            qb.push_bind(author_id);
        }
        if let Some(after) = filter.created_after {
            qb.push(" AND c.created_at >= ");
            qb.push_bind(after);
        }
        if let Some(before) = filter.created_before {
            qb.push(" AND c.created_at <= ");
            qb.push_bind(before);
        }
        match filter.is_reply {
            Some(true) => {
                qb.push(" AND c.parent_id IS NOT NULL");
            }
            Some(false) => {
                qb.push(" AND c.parent_id IS NULL");
            }
            None => {}
        }
    }

    async fn page_comments(
        &self,
        visibility: Visibility,
        filter: &CommentQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CommentWithAuthor>, RepoError> {
        let mut count_qb = QueryBuilder::new(format!("SELECT COUNT(*){COMMENT_FROM}"));
        Self::push_visibility(&mut count_qb, "c", visibility, false);
        Self::apply_comment_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {COMMENT_COLUMNS}, u.username AS author_username{COMMENT_FROM}"
        ));
        Self::push_visibility(&mut qb, "c", visibility, false);
        Self::apply_comment_filter(&mut qb, filter);
        qb.push(" ORDER BY c.created_at DESC, c.id DESC LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<CommentWithAuthorRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let items = rows.into_iter().map(CommentWithAuthor::from).collect();
        Ok(Page::new(items, page, convert_count(total)?))
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_comments(
        &self,
        visibility: Visibility,
        filter: &CommentQueryFilter,
        page: PageRequest,
    ) -> Result<Page<CommentWithAuthor>, RepoError> {
        self.page_comments(visibility, filter, page).await
    }

    async fn find_comment(
        &self,
        visibility: Visibility,
        id: Uuid,
    ) -> Result<Option<CommentWithAuthor>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {COMMENT_COLUMNS}, u.username AS author_username{COMMENT_FROM} AND c.id = "
        ));
        qb.push_bind(id);
        Self::push_visibility(&mut qb, "c", visibility, false);

        let row = qb
            .build_query_as::<CommentWithAuthorRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(CommentWithAuthor::from))
    }

    async fn top_level_comments(
        &self,
        article_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentWithAuthor>, RepoError> {
        let filter = CommentQueryFilter {
            article_id: Some(article_id),
            is_reply: Some(false),
            ..Default::default()
        };
        self.page_comments(Visibility::Active, &filter, page).await
    }

    async fn replies_for(
        &self,
        parent_ids: &[Uuid],
        per_parent: usize,
    ) -> Result<Vec<CommentWithAuthor>, RepoError> {
        if parent_ids.is_empty() || per_parent == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT ranked.* FROM (\
                 SELECT {COMMENT_COLUMNS}, u.username AS author_username, \
                        ROW_NUMBER() OVER (\
                            PARTITION BY c.parent_id ORDER BY c.created_at DESC, c.id DESC\
                        ) AS reply_rank \
                 FROM comments c \
                 INNER JOIN users u ON u.id = c.author_id \
                 WHERE c.parent_id = ANY($1) AND c.is_deleted = FALSE\
             ) ranked \
             WHERE ranked.reply_rank <= $2 \
             ORDER BY ranked.parent_id, ranked.created_at DESC, ranked.id DESC"
        );
        let limit = i64::try_from(per_parent).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, CommentWithAuthorRow>(&sql)
            .bind(parent_ids)
            .bind(limit)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentWithAuthor::from).collect())
    }

    async fn count_active_for_article(&self, article_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE article_id = $1 AND is_deleted = FALSE",
        )
        .bind(article_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        convert_count(count)
    }
}

#[async_trait]
impl CommentsWriteRepo for PostgresRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let CreateCommentParams {
            id,
            article_id,
            author_id,
            parent_id,
            content,
            created_at,
        } = params;

        let sql = format!(
            "INSERT INTO comments AS c (\
                 id, article_id, author_id, parent_id, content, created_at, updated_at\
             ) VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING {COMMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .bind(article_id)
            .bind(author_id)
            .bind(parent_id)
            .bind(content)
            .bind(created_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }

    async fn update_comment_content(
        &self,
        id: Uuid,
        content: &str,
        updated_at: OffsetDateTime,
    ) -> Result<CommentRecord, RepoError> {
        let sql = format!(
            "UPDATE comments AS c SET content = $2, updated_at = $3 \
             WHERE c.id = $1 RETURNING {COMMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .bind(content)
            .bind(updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }

    async fn set_comment_deletion(
        &self,
        id: Uuid,
        state: SoftDeleteState,
        updated_at: OffsetDateTime,
    ) -> Result<CommentRecord, RepoError> {
        let sql = format!(
            "UPDATE comments AS c SET is_deleted = $2, deleted_at = $3, updated_at = $4 \
             WHERE c.id = $1 RETURNING {COMMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .bind(state.is_deleted)
            .bind(state.deleted_at)
            .bind(updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }
}

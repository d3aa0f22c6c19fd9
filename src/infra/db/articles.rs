use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    ArticleOrdering, ArticleQueryFilter, ArticleStatistics, ArticleSummary, ArticlesRepo,
    ArticlesWriteRepo, AuthorArticleCount, CreateArticleParams, RepoError, SortDirection,
    UpdateArticleParams,
};
use crate::domain::entities::{ArticleRecord, SoftDeleteState};
use crate::domain::slug::belongs_to_base;
use crate::domain::visibility::ArticleScope;

use super::PostgresRepositories;
use super::rows::{ARTICLE_COLUMNS, ArticleRow, ArticleSummaryRow};
use super::util::{contains_pattern, convert_count, escape_like, map_sqlx_error};

const TOP_AUTHORS: i64 = 5;

impl PostgresRepositories {
    fn apply_article_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ArticleQueryFilter) {
        if let Some(title) = filter.title.as_deref() {
            qb.push(" AND a.title ILIKE ");
            qb.push_bind(contains_pattern(title));
        }
        if let Some(author) = filter.author.as_deref() {
            qb.push(" AND u.username ILIKE ");
            qb.push_bind(contains_pattern(author));
        }
        if let Some(tags) = filter.tags.as_deref() {
            qb.push(" AND a.tags ILIKE ");
            qb.push_bind(contains_pattern(tags));
        }
        if let Some(after) = filter.created_after {
            qb.push(" AND a.created_at >= ");
            qb.push_bind(after);
        }
        if let Some(before) = filter.created_before {
            qb.push(" AND a.created_at <= ");
            qb.push_bind(before);
        }
        if let Some(published) = filter.is_published {
            qb.push(" AND a.is_published = ");
            qb.push_bind(published);
        }
        if let Some(min_views) = filter.min_views {
            qb.push(" AND a.views_count >= ");
            qb.push_bind(min_views);
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = contains_pattern(search);
            qb.push(" AND (a.title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR a.content ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR a.tags ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR u.username ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    fn push_article_ordering(qb: &mut QueryBuilder<'_, Postgres>, ordering: ArticleOrdering) {
        let direction = match ordering.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        qb.push(format!(
            " ORDER BY a.{} {direction}, a.id {direction}",
            ordering.field.as_str()
        ));
    }

    async fn find_article(
        &self,
        scope: ArticleScope,
        column: &str,
        bind: impl FnOnce(&mut QueryBuilder<'_, Postgres>),
    ) -> Result<Option<ArticleRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {ARTICLE_COLUMNS} FROM articles a WHERE a."));
        qb.push(column);
        qb.push(" = ");
        bind(&mut qb);
        Self::push_article_scope(&mut qb, scope);

        let row = qb
            .build_query_as::<ArticleRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(ArticleRecord::from))
    }
}

#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn list_articles(
        &self,
        scope: ArticleScope,
        filter: &ArticleQueryFilter,
        ordering: ArticleOrdering,
        page: PageRequest,
    ) -> Result<Page<ArticleSummary>, RepoError> {
        let mut count_qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM articles a INNER JOIN users u ON u.id = a.author_id WHERE 1=1",
        );
        Self::push_article_scope(&mut count_qb, scope);
        Self::apply_article_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {ARTICLE_COLUMNS}, u.username AS author_username, \
             (SELECT COUNT(*) FROM comments c WHERE c.article_id = a.id AND c.is_deleted = FALSE) \
             AS comments_count \
             FROM articles a INNER JOIN users u ON u.id = a.author_id WHERE 1=1"
        ));
        Self::push_article_scope(&mut qb, scope);
        Self::apply_article_filter(&mut qb, filter);
        Self::push_article_ordering(&mut qb, ordering);
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<ArticleSummaryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let items = rows
            .into_iter()
            .map(ArticleSummary::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, page, convert_count(total)?))
    }

    async fn find_by_slug(
        &self,
        scope: ArticleScope,
        slug: &str,
    ) -> Result<Option<ArticleRecord>, RepoError> {
        let slug = slug.to_string();
        self.find_article(scope, "slug", |qb| {
            qb.push_bind(slug);
        })
        .await
    }

    async fn find_by_id(
        &self,
        scope: ArticleScope,
        id: Uuid,
    ) -> Result<Option<ArticleRecord>, RepoError> {
        self.find_article(scope, "id", |qb| {
            qb.push_bind(id);
        })
        .await
    }

    async fn slugs_with_base(&self, base: &str) -> Result<HashSet<String>, RepoError> {
        let slugs: Vec<String> =
            sqlx::query_scalar("SELECT slug FROM articles WHERE slug = $1 OR slug LIKE $2")
                .bind(base)
                .bind(format!("{}-%", escape_like(base)))
                .fetch_all(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(slugs
            .into_iter()
            .filter(|slug| belongs_to_base(slug, base))
            .collect())
    }

    async fn title_taken(&self, title: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM articles \
             WHERE lower(title) = lower($1) AND is_deleted = FALSE \
             AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(title)
        .bind(exclude)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn count_published_by_author(&self, author_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM articles \
             WHERE author_id = $1 AND is_deleted = FALSE AND is_published = TRUE",
        )
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn statistics(&self) -> Result<ArticleStatistics, RepoError> {
        let (total_articles, published_articles, total_views): (i64, i64, i64) = sqlx::query_as(
            "SELECT \
                 COUNT(*) FILTER (WHERE is_deleted = FALSE), \
                 COUNT(*) FILTER (WHERE is_deleted = FALSE AND is_published = TRUE), \
                 COALESCE(SUM(views_count) FILTER (WHERE is_deleted = FALSE AND is_published = TRUE), 0)::BIGINT \
             FROM articles",
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let total_comments: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE is_deleted = FALSE")
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        let authors: Vec<(String, i64)> = sqlx::query_as(
            "SELECT u.username, COUNT(a.id) AS article_count \
             FROM users u \
             INNER JOIN articles a ON a.author_id = u.id \
                 AND a.is_deleted = FALSE AND a.is_published = TRUE \
             GROUP BY u.username \
             ORDER BY article_count DESC, u.username ASC \
             LIMIT $1",
        )
        .bind(TOP_AUTHORS)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let top_authors = authors
            .into_iter()
            .map(|(username, count)| {
                Ok(AuthorArticleCount {
                    username,
                    article_count: convert_count(count)?,
                })
            })
            .collect::<Result<Vec<_>, RepoError>>()?;

        Ok(ArticleStatistics {
            total_articles: convert_count(total_articles)?,
            published_articles: convert_count(published_articles)?,
            total_views,
            total_comments: convert_count(total_comments)?,
            top_authors,
        })
    }
}

#[async_trait]
impl ArticlesWriteRepo for PostgresRepositories {
    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let CreateArticleParams {
            id,
            title,
            slug,
            content,
            excerpt,
            author_id,
            is_published,
            tags,
            created_at,
        } = params;

        let sql = format!(
            "INSERT INTO articles AS a (\
                 id, title, slug, content, excerpt, author_id, is_published, tags, \
                 created_at, updated_at\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9) \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .bind(title)
            .bind(slug)
            .bind(content)
            .bind(excerpt)
            .bind(author_id)
            .bind(is_published)
            .bind(tags)
            .bind(created_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(ArticleRecord::from(row))
    }

    async fn update_article(
        &self,
        params: UpdateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let UpdateArticleParams {
            id,
            title,
            content,
            excerpt,
            is_published,
            tags,
            updated_at,
        } = params;

        let sql = format!(
            "UPDATE articles AS a \
             SET title = $2, content = $3, excerpt = $4, is_published = $5, tags = $6, \
                 updated_at = $7 \
             WHERE a.id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .bind(title)
            .bind(content)
            .bind(excerpt)
            .bind(is_published)
            .bind(tags)
            .bind(updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(ArticleRecord::from(row))
    }

    async fn set_article_deletion(
        &self,
        id: Uuid,
        state: SoftDeleteState,
        updated_at: OffsetDateTime,
    ) -> Result<ArticleRecord, RepoError> {
        let sql = format!(
            "UPDATE articles AS a \
             SET is_deleted = $2, deleted_at = $3, updated_at = $4 \
             WHERE a.id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .bind(state.is_deleted)
            .bind(state.deleted_at)
            .bind(updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(ArticleRecord::from(row))
    }

    async fn increment_views(&self, id: Uuid) -> Result<i64, RepoError> {
        // Single-statement increment; concurrent callers never lose an update.
        sqlx::query_scalar(
            "UPDATE articles SET views_count = views_count + 1 WHERE id = $1 RETURNING views_count",
        )
        .bind(id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

//! Postgres-backed repository implementations.

mod articles;
mod comments;
mod rows;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{RepoError, StorageHealth};
use crate::domain::visibility::{ArticleScope, Visibility};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Append the scope predicate for the `a` (articles) alias.
    fn push_article_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: ArticleScope) {
        match scope {
            ArticleScope::View(visibility) => Self::push_visibility(qb, "a", visibility, true),
            ArticleScope::PublishedOrOwn { viewer } => {
                qb.push(" AND a.is_deleted = FALSE AND (a.is_published = TRUE OR a.author_id = ");
                qb.push_bind(viewer);
                qb.push(")");
            }
            ArticleScope::AuthoredBy { author } => {
                qb.push(" AND a.is_deleted = FALSE AND a.author_id = ");
                qb.push_bind(author);
            }
        }
    }

    fn push_visibility(
        qb: &mut QueryBuilder<'_, Postgres>,
        alias: &str,
        visibility: Visibility,
        publishable: bool,
    ) {
        match visibility {
            Visibility::All => {}
            Visibility::Active => {
                qb.push(format!(" AND {alias}.is_deleted = FALSE"));
            }
            Visibility::Published => {
                qb.push(format!(" AND {alias}.is_deleted = FALSE"));
                if publishable {
                    qb.push(format!(" AND {alias}.is_published = TRUE"));
                }
            }
        }
    }
}

#[async_trait]
impl StorageHealth for PostgresRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreateUserParams, RepoError, UpdateProfileParams, UserActivity, UsersRepo, UsersWriteRepo,
};
use crate::domain::entities::UserRecord;

use super::PostgresRepositories;
use super::rows::{USER_COLUMNS, UserRow};
use super::util::{convert_count, map_sqlx_error};

impl PostgresRepositories {
    async fn find_user_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE {predicate} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(UserRecord::from))
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(UserRecord::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        self.find_user_where("u.username", username).await
    }

    async fn find_by_token_prefix(&self, prefix: &str) -> Result<Option<UserRecord>, RepoError> {
        self.find_user_where("u.token_prefix", prefix).await
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<UserRecord>, RepoError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u ORDER BY u.username ASC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let items = rows.into_iter().map(UserRecord::from).collect();
        Ok(Page::new(items, page, convert_count(total)?))
    }

    async fn activity(&self, id: Uuid) -> Result<UserActivity, RepoError> {
        let (articles, comments): (i64, i64) = sqlx::query_as(
            "SELECT \
                 (SELECT COUNT(*) FROM articles \
                  WHERE author_id = $1 AND is_deleted = FALSE AND is_published = TRUE), \
                 (SELECT COUNT(*) FROM comments WHERE author_id = $1 AND is_deleted = FALSE)",
        )
        .bind(id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(UserActivity {
            articles_count: convert_count(articles)?,
            comments_count: convert_count(comments)?,
        })
    }
}

#[async_trait]
impl UsersWriteRepo for PostgresRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let CreateUserParams {
            id,
            username,
            email,
            first_name,
            last_name,
            token_prefix,
            token_hash,
            date_joined,
        } = params;

        let sql = format!(
            "INSERT INTO users AS u (\
                 id, username, email, first_name, last_name, token_prefix, token_hash, date_joined\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(username)
            .bind(email)
            .bind(first_name)
            .bind(last_name)
            .bind(token_prefix)
            .bind(token_hash)
            .bind(date_joined)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(UserRecord::from(row))
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        let sql = format!(
            "UPDATE users AS u SET email = $2, first_name = $3, last_name = $4 \
             WHERE u.id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(params.id)
            .bind(params.email)
            .bind(params.first_name)
            .bind(params.last_name)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(UserRecord::from(row))
    }

    async fn replace_token(
        &self,
        id: Uuid,
        token_prefix: &str,
        token_hash: &[u8],
    ) -> Result<UserRecord, RepoError> {
        let sql = format!(
            "UPDATE users AS u SET token_prefix = $2, token_hash = $3 \
             WHERE u.id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(token_prefix)
            .bind(token_hash)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(UserRecord::from(row))
    }
}

use std::sync::Arc;

use crate::application::articles::ArticleService;
use crate::application::comments::CommentService;
use crate::application::pagination::PageLimits;
use crate::application::repos::{
    ArticlesRepo, ArticlesWriteRepo, CommentsRepo, CommentsWriteRepo, UsersRepo, UsersWriteRepo,
};
use crate::application::users::UserService;
use crate::cache::CacheHandles;

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub articles: Arc<ArticleService>,
    pub comments: Arc<CommentService>,
    pub users: Arc<UserService>,
    pub rate_limiter: Arc<ApiRateLimiter>,
    pub page_limits: PageLimits,
}

impl ApiState {
    /// Wire every service over one repository implementation.
    pub fn from_repositories<R>(
        repos: Arc<R>,
        cache: &CacheHandles,
        rate_limiter: Arc<ApiRateLimiter>,
        page_limits: PageLimits,
    ) -> Self
    where
        R: ArticlesRepo
            + ArticlesWriteRepo
            + CommentsRepo
            + CommentsWriteRepo
            + UsersRepo
            + UsersWriteRepo
            + 'static,
    {
        let articles = ArticleService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            cache.store.clone(),
            cache.trigger.clone(),
        );
        let comments = CommentService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            cache.store.clone(),
            cache.trigger.clone(),
        );
        let users = UserService::new(repos.clone(), repos);

        Self {
            articles: Arc::new(articles),
            comments: Arc::new(comments),
            users: Arc::new(users),
            rate_limiter,
            page_limits,
        }
    }
}

//! API handlers organized by resource type.
//!
//! Query structs and the service-error conversions are shared here.

mod articles;
mod comments;
mod users;

pub use articles::*;
pub use comments::*;
pub use users::*;

// ----- Shared query structs -----

use serde::Deserialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::application::pagination::{PageLimits, PageRequest};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn request(&self, limits: &PageLimits) -> PageRequest {
        limits.request(self.page, self.page_size)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub ordering: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub tags: Option<String>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub is_published: Option<bool>,
    pub min_views: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub article: Option<Uuid>,
    pub article_slug: Option<String>,
    pub author: Option<String>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub is_reply: Option<bool>,
}

fn parse_instant(field: &'static str, value: Option<&str>) -> Result<Option<OffsetDateTime>, ApiError> {
    value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            OffsetDateTime::parse(raw, &Rfc3339).map_err(|_| {
                ApiError::validation("Enter a valid RFC 3339 date/time.", Some(field))
            })
        })
        .transpose()
}

/// Blank query values mean "no filter".
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ----- Shared error conversions -----

use crate::application::articles::ArticleError;
use crate::application::comments::{CommentError, FORBIDDEN_MESSAGE};
use crate::application::repos::RepoError;
use crate::application::users::{AuthError, UserError};
use crate::domain::error::DomainError;

use super::error::ApiError;

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::duplicate(constraint),
        RepoError::NotFound => ApiError::not_found("resource"),
        RepoError::InvalidInput { message } => {
            ApiError::validation("Invalid input.", None).with_detail(message)
        }
        RepoError::Integrity { message } => {
            ApiError::validation("Integrity constraint violated.", None).with_detail(message)
        }
        RepoError::Timeout => ApiError::storage_unavailable("database timeout"),
        RepoError::Persistence(message) => ApiError::storage_unavailable(message),
    }
}

pub(crate) fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::NotFound { entity } => ApiError::not_found(entity),
        DomainError::Validation { field, message } => ApiError::validation(message, Some(field)),
        DomainError::Invariant { message } => ApiError::internal(message),
    }
}

pub(crate) fn article_to_api(err: ArticleError) -> ApiError {
    match err {
        ArticleError::Domain(err) => domain_to_api(err),
        ArticleError::Forbidden => ApiError::forbidden(FORBIDDEN_MESSAGE),
        ArticleError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn comment_to_api(err: CommentError) -> ApiError {
    match err {
        CommentError::Domain(err) => domain_to_api(err),
        CommentError::Forbidden => ApiError::forbidden(FORBIDDEN_MESSAGE),
        CommentError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn user_to_api(err: UserError) -> ApiError {
    match err {
        UserError::Domain(err) => domain_to_api(err),
        UserError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn auth_to_api(err: AuthError) -> ApiError {
    match err {
        AuthError::Missing | AuthError::Invalid => ApiError::unauthorized(),
        AuthError::Repo(err) => repo_to_api(err),
    }
}

//! Comment handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::comments::CreateCommentCommand;
use crate::application::repos::CommentQueryFilter;

use super::{CommentListQuery, PageQuery, comment_to_api, non_blank, parse_instant};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::Authenticated;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_comments(
    State(state): State<ApiState>,
    Query(query): Query<CommentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = CommentQueryFilter {
        article_id: query.article,
        article_slug: non_blank(query.article_slug),
        author: non_blank(query.author),
        author_id: None,
        created_after: parse_instant("created_after", query.created_after.as_deref())?,
        created_before: parse_instant("created_before", query.created_before.as_deref())?,
        is_reply: query.is_reply,
    };
    let page = state.page_limits.request(query.page, query.page_size);

    let listing = state
        .comments
        .list(&filter, page)
        .await
        .map_err(comment_to_api)?;

    Ok(Json(listing.map(CommentView::from)))
}

pub async fn create_comment(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Json(payload): Json<CommentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateCommentCommand {
        article_id: payload.article,
        content: payload.content,
        parent_id: payload.parent,
    };

    let comment = state
        .comments
        .create(&principal, command)
        .await
        .map_err(comment_to_api)?;

    Ok((StatusCode::CREATED, Json(CommentView::from(comment))))
}

pub async fn my_comments(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state
        .comments
        .mine(&principal, query.request(&state.page_limits))
        .await
        .map_err(comment_to_api)?;

    Ok(Json(listing.map(CommentView::from)))
}

pub async fn get_comment(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = state
        .comments
        .retrieve(id)
        .await
        .map_err(comment_to_api)?;

    Ok(Json(CommentThreadView::from(thread)))
}

pub async fn update_comment(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comments
        .update(&principal, id, &payload.content)
        .await
        .map_err(comment_to_api)?;

    Ok(Json(CommentView::from(comment)))
}

pub async fn delete_comment(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .comments
        .soft_delete(&principal, id)
        .await
        .map_err(comment_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_comment(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comments
        .restore(&principal, id)
        .await
        .map_err(comment_to_api)?;

    Ok(Json(CommentView::from(comment)))
}

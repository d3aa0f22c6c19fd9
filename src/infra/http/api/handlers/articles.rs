//! Article handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::articles::{CreateArticleCommand, UpdateArticleCommand};
use crate::application::repos::{ArticleOrdering, ArticleQueryFilter};

use super::{
    ArticleListQuery, PageQuery, article_to_api, non_blank, parse_instant,
};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::{Authenticated, Viewer};
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_articles(
    State(state): State<ApiState>,
    viewer: Viewer,
    Query(query): Query<ArticleListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ordering = match non_blank(query.ordering) {
        Some(raw) => raw
            .parse::<ArticleOrdering>()
            .map_err(|err| ApiError::validation(err.to_string(), Some("ordering")))?,
        None => ArticleOrdering::default(),
    };

    let filter = ArticleQueryFilter {
        title: non_blank(query.title),
        author: non_blank(query.author),
        tags: non_blank(query.tags),
        created_after: parse_instant("created_after", query.created_after.as_deref())?,
        created_before: parse_instant("created_before", query.created_before.as_deref())?,
        is_published: query.is_published,
        min_views: query.min_views,
        search: non_blank(query.search),
    };
    let page = state.page_limits.request(query.page, query.page_size);

    let listing = state
        .articles
        .list(viewer.principal(), &filter, ordering, page)
        .await
        .map_err(article_to_api)?;

    Ok(Json(listing.map(ArticleListItem::from)))
}

pub async fn create_article(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Json(payload): Json<ArticleCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateArticleCommand {
        title: payload.title,
        content: payload.content,
        excerpt: payload.excerpt,
        is_published: payload.is_published,
        tags: payload.tags,
        tags_list: payload.tags_list,
    };

    let article = state
        .articles
        .create(&principal, command)
        .await
        .map_err(article_to_api)?;

    Ok((StatusCode::CREATED, Json(ArticleResponse::from(article))))
}

pub async fn article_statistics(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.articles.statistics().await.map_err(article_to_api)?;
    Ok(Json(stats))
}

pub async fn my_articles(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state
        .articles
        .mine(&principal, query.request(&state.page_limits))
        .await
        .map_err(article_to_api)?;

    Ok(Json(listing.map(ArticleListItem::from)))
}

pub async fn get_article(
    State(state): State<ApiState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .articles
        .retrieve(viewer.principal(), &slug)
        .await
        .map_err(article_to_api)?;

    Ok(Json(ArticleDetailResponse::from(detail)))
}

pub async fn update_article(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Path(slug): Path<String>,
    Json(payload): Json<ArticleUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateArticleCommand {
        title: payload.title,
        content: payload.content,
        excerpt: payload.excerpt,
        is_published: payload.is_published,
        tags: payload.tags,
        tags_list: payload.tags_list,
    };

    let article = state
        .articles
        .update(&principal, &slug, command)
        .await
        .map_err(article_to_api)?;

    Ok(Json(ArticleResponse::from(article)))
}

pub async fn delete_article(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .articles
        .soft_delete(&principal, &slug)
        .await
        .map_err(article_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_article(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .articles
        .restore(&principal, &slug)
        .await
        .map_err(article_to_api)?;

    Ok(Json(ArticleResponse::from(article)))
}

pub async fn article_comments(
    State(state): State<ApiState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let threads = state
        .articles
        .comments(viewer.principal(), &slug, query.request(&state.page_limits))
        .await
        .map_err(article_to_api)?;

    Ok(Json(threads.map(CommentThreadView::from)))
}

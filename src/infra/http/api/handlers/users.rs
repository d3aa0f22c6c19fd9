//! User and profile handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::users::{RegisterUserCommand, UpdateProfileCommand};

use super::{PageQuery, user_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::Authenticated;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn register_user(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = RegisterUserCommand {
        username: payload.username,
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
    };

    let issued = state.users.register(command).await.map_err(user_to_api)?;
    Ok((StatusCode::CREATED, Json(TokenResponse::from(issued))))
}

pub async fn list_profiles(
    State(state): State<ApiState>,
    Authenticated(_principal): Authenticated,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let profiles = state
        .users
        .list_profiles(query.request(&state.page_limits))
        .await
        .map_err(user_to_api)?;
    Ok(Json(profiles))
}

pub async fn my_profile(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.users.me(&principal).await.map_err(user_to_api)?;
    Ok(Json(profile))
}

pub async fn update_my_profile(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateProfileCommand {
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
    };

    let profile = state
        .users
        .update_profile(&principal, command)
        .await
        .map_err(user_to_api)?;
    Ok(Json(profile))
}

pub async fn rotate_token(
    State(state): State<ApiState>,
    Authenticated(principal): Authenticated,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state
        .users
        .rotate_token(&principal)
        .await
        .map_err(user_to_api)?;
    Ok(Json(TokenResponse::from(issued)))
}

pub async fn get_profile(
    State(state): State<ApiState>,
    Authenticated(_principal): Authenticated,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .users
        .profile(&username)
        .await
        .map_err(user_to_api)?;
    Ok(Json(profile))
}

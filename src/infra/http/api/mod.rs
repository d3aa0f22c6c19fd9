pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::RouterState;
use crate::infra::http::middleware::log_responses;

pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    let auth_state = state.api.clone();
    let rate_state = state.api.clone();

    Router::new()
        .route("/api/v1/users/register", post(handlers::register_user))
        .route("/api/v1/users/profiles", get(handlers::list_profiles))
        .route(
            "/api/v1/users/profiles/me",
            get(handlers::my_profile).patch(handlers::update_my_profile),
        )
        .route(
            "/api/v1/users/profiles/me/token",
            post(handlers::rotate_token),
        )
        .route(
            "/api/v1/users/profiles/{username}",
            get(handlers::get_profile),
        )
        .route(
            "/api/v1/content/articles",
            get(handlers::list_articles).post(handlers::create_article),
        )
        .route(
            "/api/v1/content/articles/statistics",
            get(handlers::article_statistics),
        )
        .route("/api/v1/content/articles/mine", get(handlers::my_articles))
        .route(
            "/api/v1/content/articles/{slug}",
            get(handlers::get_article)
                .patch(handlers::update_article)
                .delete(handlers::delete_article),
        )
        .route(
            "/api/v1/content/articles/{slug}/restore",
            post(handlers::restore_article),
        )
        .route(
            "/api/v1/content/articles/{slug}/comments",
            get(handlers::article_comments),
        )
        .route(
            "/api/v1/content/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route("/api/v1/content/comments/mine", get(handlers::my_comments))
        .route(
            "/api/v1/content/comments/{id}",
            get(handlers::get_comment)
                .patch(handlers::update_comment)
                .delete(handlers::delete_comment),
        )
        .route(
            "/api/v1/content/comments/{id}/restore",
            post(handlers::restore_comment),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            rate_state,
            middleware::api_rate_limit,
        ))
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::api_auth,
        ))
        .layer(axum_middleware::from_fn(log_responses))
}

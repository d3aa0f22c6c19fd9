use std::convert::Infallible;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use tracing::warn;

use crate::application::users::Principal;

use super::error::ApiError;
use super::handlers::auth_to_api;
use super::rate_limit::RateDecision;
use super::state::ApiState;

const API_KEY_HEADER: &str = "x-api-key";
const RATE_LIMIT_HEADER: &str = "x-ratelimit-limit";
const RATE_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Resolve the caller's token into a [`Principal`] extension.
///
/// Requests without a token continue anonymously; a token that does not
/// authenticate is rejected.
pub async fn api_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers()) else {
        return next.run(request).await;
    };

    let principal = match state.users.authenticate(&token).await {
        Ok(principal) => principal,
        Err(err) => return auth_to_api(err).into_response(),
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    // Outer layers such as the response logger only see the response.
    response.extensions_mut().insert(principal);
    response
}

/// Sliding-window limit keyed on the user, or the peer address when anonymous.
pub async fn api_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&request);

    match state.rate_limiter.check(&client) {
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(
                RATE_LIMIT_HEADER,
                HeaderValue::from(state.rate_limiter.limit()),
            );
            headers.insert(RATE_REMAINING_HEADER, HeaderValue::from(remaining));
            response
        }
        RateDecision::Limited { retry_after } => {
            warn!(
                target = "content_hub::api::ratelimit",
                client = %client,
                path = %request.uri().path(),
                "rate limit exceeded"
            );
            counter!("content_hub_http_rate_limited_total").increment(1);
            ApiError::rate_limited(retry_after.as_secs().max(1))
        }
    }
}

fn client_key(request: &Request<Body>) -> String {
    if let Some(principal) = request.extensions().get::<Principal>() {
        return format!("user:{}", principal.user_id);
    }
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "anonymous".to_string(),
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(str::trim);
    let api_key = || {
        headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
    };

    bearer
        .or_else(api_key)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// The authenticated caller; rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// The caller when one authenticated, otherwise anonymous.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<Principal>);

impl Viewer {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(parts.extensions.get::<Principal>().cloned()))
    }
}

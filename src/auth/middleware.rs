//! Request extractors
//!
//! Resolve the caller from the `Authorization` header and give every
//! handler a deadline-bound [`Context`].

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use super::token::TokenService;
use crate::AppState;
use crate::context::Context;
use crate::data::UserRecord;
use crate::error::AppError;

/// Client token from the header, sent raw or as `Bearer <token>`
fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => value,
    };

    (!token.is_empty()).then(|| token.to_owned())
}

/// Per-request context bounded by `http.request_timeout_seconds`
#[derive(Debug, Clone)]
pub struct RequestContext(pub Context);

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<Context>().cloned() {
            return Ok(RequestContext(ctx));
        }

        let state = AppState::from_ref(state);
        let ctx = Context::background().with_timeout(state.config.http.request_timeout());
        parts.extensions.insert(ctx.clone());

        Ok(RequestContext(ctx))
    }
}

async fn authenticate(parts: &mut Parts, state: &AppState, token: &str) -> Result<UserRecord, AppError> {
    let RequestContext(ctx) = RequestContext::from_request_parts(parts, state)
        .await
        .unwrap_or_else(|never| match never {});

    let user = TokenService::new(state.db.as_ref())
        .verify_token(&ctx, token)
        .await?;
    parts.extensions.insert(user.clone());

    Ok(user)
}

/// Extractor for current authenticated user
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", user.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<UserRecord>().cloned() {
            return Ok(CurrentUser(user));
        }

        let state = AppState::from_ref(state);
        let token = extract_token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
        let user = authenticate(parts, &state, &token).await?;

        Ok(CurrentUser(user))
    }
}

/// Optional current user extractor
///
/// `None` when no token is sent. A token that does not verify is still
/// rejected, so a stale client learns it must sign in again.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<UserRecord>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<UserRecord>().cloned() {
            return Ok(MaybeUser(Some(user)));
        }

        let state = AppState::from_ref(state);
        match extract_token_from_headers(&parts.headers) {
            Some(token) => Ok(MaybeUser(Some(authenticate(parts, &state, &token).await?))),
            None => Ok(MaybeUser(None)),
        }
    }
}

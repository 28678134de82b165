//! Route handlers

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};

use super::converters::{article_to_response, parse_json_body};
use super::dto::*;
use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser, RequestContext, TokenService, login};
use crate::data::UserProfile;
use crate::error::AppError;
use crate::service::{ArticleListOptions, NewArticle, ProfileService};

/// GET /
pub async fn index() -> &'static str {
    tracing::debug!("Sending index");
    "Hello World!"
}

/// POST /log
///
/// Records a message reported by the web client.
pub async fn client_log(body: Bytes) -> Result<StatusCode, AppError> {
    let request: ClientLogRequest = parse_json_body(&body)?;
    tracing::info!(client_message = %request.log_message, "Client log");
    Ok(StatusCode::ACCEPTED)
}

/// POST /token
///
/// Exchanges a GitHub OAuth code for a client token.
pub async fn issue_token(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    body: Bytes,
) -> Result<Json<TokenResponse>, AppError> {
    let request: TokenRequest = parse_json_body(&body)?;
    let tokens = TokenService::new(state.db.as_ref());

    let access_token = login(&ctx, state.provider.as_ref(), &tokens, &request.code).await?;

    Ok(Json(TokenResponse { access_token }))
}

/// GET /profile
pub async fn get_profile(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserProfile>, AppError> {
    let profile = ProfileService::new(state.db.as_ref())
        .get_profile(&ctx, &user)
        .await?;

    Ok(Json(profile))
}

/// GET /articles?type=&creator=
pub async fn list_articles(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<ArticlesQuery>,
) -> Result<Json<Vec<ArticleResponse>>, AppError> {
    let options = ArticleListOptions {
        article_type: query.article_type.unwrap_or_default(),
        creator: query.creator.unwrap_or_default(),
    };

    let articles = state
        .articles
        .list_articles(&ctx, &options, viewer.as_ref())
        .await?;

    Ok(Json(articles.into_iter().map(article_to_response).collect()))
}

/// POST /create-article
pub async fn create_article(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<Json<CreateArticleResponse>, AppError> {
    let request: CreateArticleRequest = parse_json_body(&body)?;

    let created_id = state
        .articles
        .create_article(
            &ctx,
            &user,
            NewArticle {
                item_title: request.item_title,
                thumbnail: request.thumbnail,
                content: request.content,
                article_type: request.article_type,
            },
        )
        .await?;

    Ok(Json(CreateArticleResponse { created_id }))
}

//! Request and response DTOs
//!
//! Field names follow the JSON the web client already speaks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// POST /token body
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub code: String,
}

/// POST /token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// POST /log body
#[derive(Debug, Clone, Deserialize)]
pub struct ClientLogRequest {
    #[serde(rename = "logMessage")]
    pub log_message: String,
}

/// GET /articles query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticlesQuery {
    #[serde(rename = "type", default)]
    pub article_type: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
}

/// POST /create-article body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    pub item_title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub content: String,
    pub article_type: String,
}

/// POST /create-article response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleResponse {
    #[serde(rename = "createdID")]
    pub created_id: String,
}

/// Article as listed by GET /articles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub item_title: String,
    pub thumbnail: String,
    pub content: String,
    pub article_type: String,
    pub creator: String,
    pub approved: bool,
    pub created_at: Option<DateTime<Utc>>,
}

//! GitHub identity provider
//!
//! Exchanges an OAuth authorization code for an access token and resolves
//! that token to the numeric GitHub user id.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use url::Url;

use crate::config::{GitHubConfig, HttpConfig};
use crate::context::Context;
use crate::error::AppError;
use crate::metrics::OAUTH_REQUESTS_TOTAL;

/// OAuth identity provider used by the login flow
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an authorization code for a provider access token.
    async fn exchange_code(&self, ctx: &Context, code: &str) -> Result<String, AppError>;

    /// Resolve an access token to the provider's user id.
    async fn fetch_user_id(&self, ctx: &Context, access_token: &str) -> Result<String, AppError>;
}

pub struct GitHubProvider {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: Url,
    user_url: Url,
    max_response_bytes: usize,
}

impl GitHubProvider {
    /// Build a provider with a client bounded by the configured timeout.
    ///
    /// # Errors
    /// Returns error if an endpoint URL is invalid or the client cannot be built
    pub fn new(github: &GitHubConfig, http: &HttpConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("macguffin/", env!("CARGO_PKG_VERSION")))
            .timeout(http.request_timeout())
            .build()?;

        let parse = |key: &str, value: &str| {
            Url::parse(value).map_err(|e| AppError::Config(format!("{key} is not a valid URL: {e}")))
        };

        Ok(Self {
            client,
            client_id: github.client_id.clone(),
            client_secret: github.client_secret.clone(),
            token_url: parse("github.token_url", &github.token_url)?,
            user_url: parse("github.user_url", &github.user_url)?,
            max_response_bytes: http.max_response_bytes,
        })
    }

    async fn request_access_token(&self, code: &str) -> Result<String, AppError> {
        let mut url = self.token_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("code", code);

        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = read_capped(response, self.max_response_bytes).await?;
        if !status.is_success() {
            return Err(AppError::Provider(format!(
                "token endpoint returned {status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }

        let payload: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| AppError::Provider(format!("undecodable token response: {e}")))?;

        match payload.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(AppError::Provider(format!(
                "access token missing from token response ({})",
                payload.error.as_deref().unwrap_or("no error given")
            ))),
        }
    }

    async fn request_user_id(&self, access_token: &str) -> Result<String, AppError> {
        let response = self
            .client
            .get(self.user_url.clone())
            .header(AUTHORIZATION, format!("token {access_token}"))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = read_capped(response, self.max_response_bytes).await?;
        if !status.is_success() {
            return Err(AppError::Provider(format!(
                "user endpoint returned {status}"
            )));
        }

        let user: GitHubUser = serde_json::from_slice(&body)
            .map_err(|e| AppError::Provider(format!("undecodable user response: {e}")))?;

        user.id
            .map(|id| id.to_string())
            .ok_or_else(|| AppError::Provider("user id missing from user response".to_string()))
    }
}

#[async_trait]
impl IdentityProvider for GitHubProvider {
    async fn exchange_code(&self, ctx: &Context, code: &str) -> Result<String, AppError> {
        let result = ctx
            .run(self.request_access_token(code))
            .await
            .map_err(AppError::from)
            .and_then(|inner| inner);
        record("token", &result);
        result
    }

    async fn fetch_user_id(&self, ctx: &Context, access_token: &str) -> Result<String, AppError> {
        let result = ctx
            .run(self.request_user_id(access_token))
            .await
            .map_err(AppError::from)
            .and_then(|inner| inner);
        record("user", &result);
        result
    }
}

fn record<T>(endpoint: &str, result: &Result<T, AppError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(AppError::Cancelled(_)) => "interrupted",
        Err(_) => "error",
    };
    OAUTH_REQUESTS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();
}

/// Read a response body, refusing anything longer than `limit` bytes.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>, AppError> {
    let too_large = || AppError::Provider(format!("response body exceeds {limit} bytes"));

    if response
        .content_length()
        .is_some_and(|length| length > limit as u64)
    {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    #[serde(default)]
    id: Option<u64>,
}

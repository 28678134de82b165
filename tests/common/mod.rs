//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use macguffin::auth::{IdentityProvider, derive_client_token};
use macguffin::context::Context;
use macguffin::data::{
    AGENTS_COLLECTION, FixtureCollection, FixtureDatabase, TOKENS_COLLECTION, UserRecord,
};
use macguffin::error::AppError;
use macguffin::{AppState, config};
use tokio::net::TcpListener;

/// Code the static provider accepts
pub const GOOD_CODE: &str = "good-code";
/// Access token the static provider hands out for [`GOOD_CODE`]
pub const ACCESS_TOKEN: &str = "gho_test_access";
/// User id behind [`ACCESS_TOKEN`]
pub const USER_ID: &str = "31337";
/// User id configured as article admin
pub const ADMIN_ID: &str = "8582764";

/// Identity provider that knows exactly one code and one user
pub struct StaticProvider;

#[async_trait]
impl IdentityProvider for StaticProvider {
    async fn exchange_code(&self, _ctx: &Context, code: &str) -> Result<String, AppError> {
        if code == GOOD_CODE {
            Ok(ACCESS_TOKEN.to_string())
        } else {
            Err(AppError::Provider("bad_verification_code".to_string()))
        }
    }

    async fn fetch_user_id(&self, _ctx: &Context, access_token: &str) -> Result<String, AppError> {
        if access_token == ACCESS_TOKEN {
            Ok(USER_ID.to_string())
        } else {
            Err(AppError::Provider("user endpoint returned 401".to_string()))
        }
    }
}

pub fn test_config() -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
        },
        database: config::DatabaseConfig {
            uri: "mongodb://localhost:27017".to_string(),
            name: "macguffin_test".to_string(),
            token_ttl_seconds: 3600,
        },
        github: config::GitHubConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            user_url: "https://api.github.com/user".to_string(),
        },
        http: config::HttpConfig {
            request_timeout_seconds: 5,
            max_response_bytes: 50_000,
            max_request_bytes: 50_000,
        },
        articles: config::ArticlesConfig {
            collections: vec![
                "macguffins".to_string(),
                "sites".to_string(),
                "events".to_string(),
            ],
            admin_user_ids: HashSet::from([ADMIN_ID.to_string()]),
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub db: Arc<FixtureDatabase>,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server over an empty fixture database
    pub async fn new() -> Self {
        macguffin::metrics::init_metrics();

        let db = Arc::new(FixtureDatabase::new());
        let state = AppState::new(test_config(), db.clone(), Arc::new(StaticProvider));

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = macguffin::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            db,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub fn fixture(&self, collection: &str) -> Arc<FixtureCollection> {
        self.db.fixture(collection)
    }

    /// Register fixtures so `user_id` is signed in, and return the client token
    pub fn sign_in(&self, user_id: &str) -> String {
        let token = derive_client_token(ACCESS_TOKEN, user_id);

        self.fixture(TOKENS_COLLECTION).register_document(
            &serde_json::json!({ "clientToken": { "$eq": token } }),
            &serde_json::json!({ "userID": user_id, "clientToken": token }),
        );
        self.fixture(AGENTS_COLLECTION).register_document(
            &serde_json::json!({ "userID": { "$eq": user_id } }),
            &UserRecord::uninitialized(user_id),
        );

        token
    }
}

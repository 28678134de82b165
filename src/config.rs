//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use crate::data::{EVENTS_COLLECTION, MACGUFFINS_COLLECTION, SITES_COLLECTION};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub http: HttpConfig,
    pub articles: ArticlesConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

/// MongoDB configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string (e.g., "mongodb://localhost:27017")
    pub uri: String,
    /// Database name
    pub name: String,
    /// Seconds before an issued client token expires (default: 3600)
    pub token_ttl_seconds: u64,
}

impl DatabaseConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }
}

/// GitHub OAuth application
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Code exchange endpoint
    pub token_url: String,
    /// Authenticated user endpoint
    pub user_url: String,
}

/// Bounds applied to every external call
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Deadline for each database round-trip and provider request (default: 5)
    pub request_timeout_seconds: u64,
    /// Largest provider response body accepted, in bytes (default: 50000)
    pub max_response_bytes: usize,
    /// Largest request body accepted, in bytes (default: 50000)
    pub max_request_bytes: usize,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Article collections and moderation
#[derive(Debug, Clone, Deserialize)]
pub struct ArticlesConfig {
    /// Article types a caller may name; each is also a collection name
    pub collections: Vec<String>,
    /// User ids that may see unapproved articles
    #[serde(default)]
    pub admin_user_ids: HashSet<String>,
}

impl Default for ArticlesConfig {
    fn default() -> Self {
        Self {
            collections: vec![
                MACGUFFINS_COLLECTION.to_string(),
                SITES_COLLECTION.to_string(),
                EVENTS_COLLECTION.to_string(),
            ],
            admin_user_ids: HashSet::from(["8582764".to_string()]),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (MACGUFFIN__SECTION__KEY)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let articles = ArticlesConfig::default();

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.uri", "mongodb://localhost:27017")?
            .set_default("database.name", "macguffin_main")?
            .set_default("database.token_ttl_seconds", 3600)?
            .set_default("github.token_url", "https://github.com/login/oauth/access_token")?
            .set_default("github.user_url", "https://api.github.com/user")?
            .set_default("http.request_timeout_seconds", 5)?
            .set_default("http.max_response_bytes", 50_000)?
            .set_default("http.max_request_bytes", 50_000)?
            .set_default("articles.collections", articles.collections)?
            .set_default(
                "articles.admin_user_ids",
                articles.admin_user_ids.into_iter().collect::<Vec<_>>(),
            )?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (MACGUFFIN__*)
            .add_source(
                Environment::with_prefix("MACGUFFIN")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("articles.collections")
                    .with_list_parse_key("articles.admin_user_ids")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        if self.github.client_id.trim().is_empty() || self.github.client_secret.trim().is_empty() {
            return Err(AppError::Config(
                "github.client_id and github.client_secret are required".to_string(),
            ));
        }

        for (key, value) in [
            ("github.token_url", &self.github.token_url),
            ("github.user_url", &self.github.user_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| AppError::Config(format!("{key} is not a valid URL: {e}")))?;
        }

        if self.http.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "http.request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.http.max_response_bytes == 0 || self.http.max_request_bytes == 0 {
            return Err(AppError::Config(
                "http body limits must be greater than 0".to_string(),
            ));
        }

        if self.database.token_ttl_seconds == 0 {
            return Err(AppError::Config(
                "database.token_ttl_seconds must be greater than 0".to_string(),
            ));
        }

        if self.articles.collections.is_empty() {
            return Err(AppError::Config(
                "articles.collections must name at least one collection".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                uri: "mongodb://localhost:27017".to_string(),
                name: "macguffin_test".to_string(),
                token_ttl_seconds: 3600,
            },
            github: GitHubConfig {
                client_id: "github-client-id".to_string(),
                client_secret: "github-client-secret".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                user_url: "https://api.github.com/user".to_string(),
            },
            http: HttpConfig {
                request_timeout_seconds: 5,
                max_response_bytes: 50_000,
                max_request_bytes: 50_000,
            },
            articles: ArticlesConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.http.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.database.token_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn default_articles_cover_three_collections_and_one_admin() {
        let articles = ArticlesConfig::default();
        assert_eq!(articles.collections, vec!["macguffins", "sites", "events"]);
        assert!(articles.admin_user_ids.contains("8582764"));
    }

    #[test]
    fn validate_rejects_missing_github_secret() {
        let mut config = valid_config();
        config.github.client_secret = "  ".to_string();

        let error = config
            .validate()
            .expect_err("empty client secret must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("github.client_secret")
        ));
    }

    #[test]
    fn validate_rejects_bad_provider_url() {
        let mut config = valid_config();
        config.github.user_url = "not a url".to_string();

        let error = config.validate().expect_err("invalid url must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("github.user_url")
        ));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = valid_config();
        config.http.request_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_article_allow_list() {
        let mut config = valid_config();
        config.articles.collections.clear();

        let error = config.validate().expect_err("empty allow-list must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("articles.collections")
        ));
    }
}

//! Macguffin binary entry point

use std::sync::Arc;
use std::time::Duration;

use macguffin::auth::GitHubProvider;
use macguffin::context::Context;
use macguffin::data::MongoDatabase;
use macguffin::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Deadline for connecting to MongoDB and preparing indexes at startup
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Initialize metrics
/// 3. Load configuration from file and environment
/// 4. Connect to MongoDB and ensure the token TTL index
/// 5. Build the GitHub provider and Axum router
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("MACGUFFIN__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let log_level =
        std::env::var("MACGUFFIN__LOGGING__LEVEL").unwrap_or_else(|_| "info".to_string());
    let default_filter = format!("macguffin={log_level},tower_http=debug");

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| default_filter.clone().into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| default_filter.clone().into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting Macguffin...");

    // 2. Initialize metrics
    macguffin::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        database = %config.database.name,
        article_types = ?config.articles.collections,
        "Configuration loaded"
    );

    // 4. Connect to MongoDB
    let startup = Context::background().with_timeout(STARTUP_TIMEOUT);
    let db = MongoDatabase::connect(&config.database, &startup).await?;
    db.ensure_token_indexes(&startup, config.database.token_ttl())
        .await?;

    // 5. Build provider and router
    let provider = GitHubProvider::new(&config.github, &config.http)?;
    let state = AppState::new(config.clone(), Arc::new(db), Arc::new(provider));
    let app = macguffin::build_router(state);

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

//! Macguffin - HTTP backend for the Macguffin agent dossier
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Sign-in, profile and article endpoints                   │
//! │  - Client log sink, metrics                                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Auth and Service Layer                       │
//! │  - GitHub code exchange, client tokens                      │
//! │  - Article catalog, profiles                                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - Database / Collection / Cursor / SingleResult traits     │
//! │  - MongoDB implementation                                   │
//! │  - Query-hash fixture store for tests                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `auth`: GitHub OAuth and client tokens
//! - `service`: Business logic layer
//! - `data`: Storage traits and their implementations
//! - `context`: Request deadlines and cancellation
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; every field is a shared handle.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Storage, MongoDB in production and fixtures in tests
    pub db: Arc<dyn data::Database>,

    /// Identity provider for the sign-in flow
    pub provider: Arc<dyn auth::IdentityProvider>,

    /// Article listing and creation
    pub articles: service::ArticleCatalog,
}

impl AppState {
    /// Assemble state from already-connected dependencies
    pub fn new(
        config: config::AppConfig,
        db: Arc<dyn data::Database>,
        provider: Arc<dyn auth::IdentityProvider>,
    ) -> Self {
        let articles = service::ArticleCatalog::new(db.clone(), &config.articles);

        Self {
            config: Arc::new(config),
            db,
            provider,
            articles,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{cors::CorsLayer, trace::TraceLayer};

    let max_request_bytes = state.config.http.max_request_bytes;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::app_router(max_request_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}

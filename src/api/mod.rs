//! API layer
//!
//! HTTP handlers for:
//! - Sign-in (`/token`)
//! - Profiles and articles
//! - Client log sink
//! - Metrics (Prometheus)

mod converters;
mod dto;
mod handlers;
pub mod metrics;

pub use converters::*;
pub use dto::*;

pub use metrics::metrics_router;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::AppState;

/// Create the application router
///
/// Authentication is resolved per handler through the `CurrentUser` and
/// `MaybeUser` extractors.
pub fn app_router(max_request_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/log", post(handlers::client_log))
        .route("/token", post(handlers::issue_token))
        .route("/profile", get(handlers::get_profile))
        .route("/articles", get(handlers::list_articles))
        .route("/create-article", post(handlers::create_article))
        .layer(RequestBodyLimitLayer::new(max_request_bytes))
}

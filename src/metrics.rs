//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Database Metrics
    pub static ref DB_OPERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("macguffin_db_operations_total", "Total number of database operations"),
        &["operation", "collection"]
    ).expect("metric can be created");

    // Identity Provider Metrics
    pub static ref OAUTH_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("macguffin_oauth_requests_total", "Total number of identity provider requests"),
        &["endpoint", "outcome"]
    ).expect("metric can be created");

    // Token Metrics
    pub static ref TOKENS_ISSUED_TOTAL: IntCounter = IntCounter::new(
        "macguffin_tokens_issued_total",
        "Total number of client tokens issued"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("macguffin_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(DB_OPERATIONS_TOTAL.clone()))
            .expect("DB_OPERATIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(OAUTH_REQUESTS_TOTAL.clone()))
            .expect("OAUTH_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(TOKENS_ISSUED_TOTAL.clone()))
            .expect("TOKENS_ISSUED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics initialized");
    });
}

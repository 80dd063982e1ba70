//! HTTP request handlers for the Yatra Sevak API

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::orchestration::{Orchestrator, RetryPolicy};
use crate::providers::ProviderSet;

pub mod chat;
pub mod health;
pub mod metrics;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    orchestrator: Arc<Orchestrator>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create state with credentials resolved from the process environment
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        let providers = ProviderSet::from_env(&config)?;
        Self::with_providers(config, providers)
    }

    /// Create state around an already-resolved provider set
    pub fn with_providers(config: Arc<Config>, providers: ProviderSet) -> AppResult<Self> {
        let metrics = Arc::new(
            Metrics::new()
                .map_err(|e| AppError::Internal(format!("failed to register metrics: {}", e)))?,
        );

        let retry = RetryPolicy::from_config(&config.retry)
            .map_err(|e| AppError::Config(e.to_string()))?;

        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(providers),
            retry,
            config.orchestration.single_provider.clone(),
            metrics.clone(),
        ));

        Ok(Self {
            config,
            orchestrator,
            metrics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Build the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/chat", post(chat::handler))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

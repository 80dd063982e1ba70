//! Health and welcome endpoints

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::handlers::AppState;

#[derive(Debug, Serialize)]
pub struct ModelHealth {
    pub name: String,
    pub enabled: bool,
    pub priority: u32,
    /// "available" or "not configured"
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub models: BTreeMap<String, ModelHealth>,
    pub fallback_chain: &'static str,
}

/// GET /health
///
/// Reports every configured provider. A provider without credentials is
/// listed as "not configured" rather than omitted.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let models = state
        .orchestrator()
        .providers()
        .iter()
        .map(|handle| {
            let config = handle.config();
            (
                config.id().to_string(),
                ModelHealth {
                    name: config.display_name().to_string(),
                    enabled: config.enabled(),
                    priority: config.priority(),
                    status: if config.enabled() {
                        "available"
                    } else {
                        "not configured"
                    },
                },
            )
        })
        .collect();

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            models,
            fallback_chain: "enabled",
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: &'static str,
    pub health: &'static str,
}

/// GET /
pub async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Yatra Sevak travel assistant API",
        health: "/health",
    })
}

//! Prometheus metrics endpoint

use axum::{extract::State, http::StatusCode};

use crate::handlers::AppState;

/// GET /metrics
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` if encoding fails
pub async fn handler(State(state): State<AppState>) -> (StatusCode, String) {
    match state.metrics().gather() {
        Ok(output) => (StatusCode::OK, output),
        Err(e) => {
            tracing::error!(error = %e, "Failed to gather metrics for Prometheus scraping");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to gather metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::metrics::RequestOutcome;
    use crate::providers::ProviderSet;
    use std::str::FromStr;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_metrics_handler_returns_prometheus_format() {
        let config = Config::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 8000

[[providers]]
id = "groq"
kind = "openai_chat"
model = "llama3-8b-8192"
base_url = "http://localhost:1"
api_key_env = "GROQ_API_KEY"
max_tokens = 100
"#,
        )
        .unwrap();
        let state = AppState::with_providers(Arc::new(config), ProviderSet::default()).unwrap();
        state
            .metrics()
            .record_request(RequestOutcome::Success)
            .unwrap();

        let (status, body) = handler(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"yatra_chat_requests_total{outcome="success"} 1"#));
    }
}

//! Error types for Yatra Sevak
//!
//! `AppError` is the application-level error and implements `IntoResponse`
//! for Axum handlers. `ProviderError` classifies a single provider failure and
//! never crosses the orchestration boundary on its own: it is always folded
//! into a `QueryResult`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0}")]
    AllProvidersFailed(String),

    #[error("Request timed out after {timeout_seconds} seconds")]
    RequestTimeout { timeout_seconds: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::AllProvidersFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::RequestTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

/// Classified failure of a single provider call
///
/// Terminal variants (`Unauthorized`, `QuotaExceeded`, `AllProvidersFailed`,
/// `TaskFailed`) are never retried. Everything else is transient and retried
/// while the retry budget lasts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// 401/403 from the provider
    #[error("authentication failed (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// 402 from the provider
    #[error("billing or quota exceeded (HTTP 402): {message}")]
    QuotaExceeded { message: String },

    /// 503 or an explicit "model is loading" body
    #[error("model is loading (HTTP {status}): {message}")]
    ModelLoading { status: u16, message: String },

    /// 429 from the provider
    #[error("rate limited (HTTP 429): {message}")]
    RateLimited { message: String },

    /// Any other non-2xx status
    #[error("upstream error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("request timed out after {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },

    #[error("network error: {message}")]
    Network { message: String },

    /// 2xx whose body did not have the expected shape or held no text
    #[error("invalid response body: {message}")]
    InvalidResponse { message: String },

    /// The provider's invocation panicked or was aborted
    #[error("provider task failed: {message}")]
    TaskFailed { message: String },

    /// Synthesized by the selector when no provider succeeded
    #[error("All providers failed. Errors: {summary}")]
    AllProvidersFailed { summary: String },
}

impl ProviderError {
    /// Returns true if another attempt may succeed
    ///
    /// Retryable: loading, rate limits, other upstream statuses, timeouts,
    /// network failures, malformed bodies.
    /// Terminal: auth, billing/quota, task failures, aggregate failures.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModelLoading { .. }
                | Self::RateLimited { .. }
                | Self::Upstream { .. }
                | Self::Timeout { .. }
                | Self::Network { .. }
                | Self::InvalidResponse { .. }
        )
    }

    /// Inverse of [`is_retryable`](Self::is_retryable)
    pub fn is_terminal(&self) -> bool {
        !self.is_retryable()
    }

    /// Short machine-readable classification, used for logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "auth",
            Self::QuotaExceeded { .. } => "billing",
            Self::ModelLoading { .. } => "model_loading",
            Self::RateLimited { .. } => "rate_limited",
            Self::Upstream { .. } => "upstream",
            Self::Timeout { .. } => "timeout",
            Self::Network { .. } => "network",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::TaskFailed { .. } => "task_failed",
            Self::AllProvidersFailed { .. } => "all_providers_failed",
        }
    }

    /// Upstream HTTP status, when the failure came from one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. }
            | Self::ModelLoading { status, .. }
            | Self::Upstream { status, .. } => Some(*status),
            Self::QuotaExceeded { .. } => Some(402),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_validation_error_response_status() {
        let err = AppError::Validation("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_all_providers_failed_is_server_error() {
        let err = AppError::AllProvidersFailed("All providers failed".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_request_timeout_is_gateway_timeout() {
        let err = AppError::RequestTimeout {
            timeout_seconds: 120,
        };
        assert_eq!(err.to_string(), "Request timed out after 120 seconds");
        assert_eq!(err.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_terminal_errors_are_not_retryable() {
        let terminal = vec![
            ProviderError::Unauthorized {
                status: 401,
                message: "bad token".to_string(),
            },
            ProviderError::Unauthorized {
                status: 403,
                message: "forbidden".to_string(),
            },
            ProviderError::QuotaExceeded {
                message: "subscription required".to_string(),
            },
            ProviderError::TaskFailed {
                message: "panicked".to_string(),
            },
            ProviderError::AllProvidersFailed {
                summary: "a: b".to_string(),
            },
        ];

        for error in terminal {
            assert!(error.is_terminal(), "should be terminal: {:?}", error);
        }
    }

    #[test]
    fn test_transient_errors_are_retryable() {
        let transient = vec![
            ProviderError::ModelLoading {
                status: 503,
                message: "loading".to_string(),
            },
            ProviderError::RateLimited {
                message: "slow down".to_string(),
            },
            ProviderError::Upstream {
                status: 500,
                message: "boom".to_string(),
            },
            ProviderError::Upstream {
                status: 404,
                message: "not found".to_string(),
            },
            ProviderError::Timeout { timeout_seconds: 5 },
            ProviderError::Network {
                message: "connection refused".to_string(),
            },
            ProviderError::InvalidResponse {
                message: "missing choices".to_string(),
            },
        ];

        for error in transient {
            assert!(error.is_retryable(), "should be retryable: {:?}", error);
        }
    }

    #[test]
    fn test_status_reported_for_http_failures() {
        assert_eq!(
            ProviderError::QuotaExceeded {
                message: String::new()
            }
            .status(),
            Some(402)
        );
        assert_eq!(
            ProviderError::Unauthorized {
                status: 403,
                message: String::new()
            }
            .status(),
            Some(403)
        );
        assert_eq!(ProviderError::Timeout { timeout_seconds: 1 }.status(), None);
    }

    #[test]
    fn test_display_names_the_error_kind() {
        let err = ProviderError::QuotaExceeded {
            message: "subscription required".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "billing or quota exceeded (HTTP 402): subscription required"
        );
        assert_eq!(err.kind(), "billing");
    }
}

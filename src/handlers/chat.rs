//! Chat endpoint handler
//!
//! Handles POST /chat: fans the message out to the providers and returns the
//! answer chosen by the selector.

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::metrics::RequestOutcome;
use crate::middleware::RequestId;
use crate::orchestration::{ChatQuery, ChatTurn, select};

/// Maximum allowed message length in characters (100K chars)
pub const MAX_MESSAGE_LENGTH: usize = 100_000;

/// Chat request from the frontend
///
/// Validation is enforced during deserialization - invalid instances cannot exist.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    message: String,
    chat_history: Vec<ChatTurn>,
    use_single_provider: bool,
}

impl ChatRequest {
    /// Build a request outside of deserialization, applying the same checks
    pub fn new(
        message: impl Into<String>,
        chat_history: Vec<ChatTurn>,
        use_single_provider: bool,
    ) -> Result<Self, String> {
        let message = message.into();
        validate_message(&message)?;
        Ok(Self {
            message,
            chat_history,
            use_single_provider,
        })
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prior turns, oldest first
    pub fn chat_history(&self) -> &[ChatTurn] {
        &self.chat_history
    }

    /// Query only the configured single provider, with the plan-customization prompt
    pub fn use_single_provider(&self) -> bool {
        self.use_single_provider
    }

    /// Borrowed view handed to the orchestrator
    pub fn query(&self) -> ChatQuery<'_> {
        ChatQuery::new(&self.message, &self.chat_history)
            .with_single_provider(self.use_single_provider)
    }
}

fn validate_message(message: &str) -> Result<(), String> {
    if message.trim().is_empty() {
        return Err("message cannot be empty or contain only whitespace".to_string());
    }

    // Unicode characters, not bytes
    let char_count = message.chars().count();
    if char_count > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "message exceeds maximum length of {} characters (got {})",
            MAX_MESSAGE_LENGTH, char_count
        ));
    }
    Ok(())
}

impl<'de> Deserialize<'de> for ChatRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawChatRequest {
            message: String,
            #[serde(default)]
            chat_history: Vec<ChatTurn>,
            // the frontend still sends the older field name
            #[serde(default, alias = "use_groq")]
            use_single_provider: bool,
        }

        let raw = RawChatRequest::deserialize(deserializer)?;
        validate_message(&raw.message).map_err(<D::Error as serde::de::Error>::custom)?;

        Ok(ChatRequest {
            message: raw.message,
            chat_history: raw.chat_history,
            use_single_provider: raw.use_single_provider,
        })
    }
}

/// Chat response to the frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    /// Display name of the provider whose answer was chosen
    pub model_used: String,
}

/// POST /chat handler
///
/// The whole orchestration, retries and backoff included, is bounded by
/// `server.request_timeout_seconds`. On expiry the in-flight provider calls
/// are dropped and 504 is returned.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    tracing::info!(
        request_id = %request_id,
        message_length = request.message().chars().count(),
        history_turns = request.chat_history().len(),
        use_single_provider = request.use_single_provider(),
        "Received chat request"
    );

    let timeout_seconds = state.config().server.request_timeout_seconds;
    let run = state.orchestrator().run(request.query(), request_id);

    let batch = match tokio::time::timeout(Duration::from_secs(timeout_seconds), run).await {
        Ok(batch) => batch?,
        Err(_) => {
            tracing::error!(
                request_id = %request_id,
                timeout_seconds,
                "Chat request timed out, dropping in-flight provider calls"
            );
            record(&state, request_id, RequestOutcome::Timeout);
            return Err(AppError::RequestTimeout { timeout_seconds });
        }
    };

    let winner = select(batch);
    let provider_id = winner.provider_id().to_string();
    let model_used = winner.display_name().to_string();

    match winner.into_outcome() {
        Ok(response) => {
            tracing::info!(
                request_id = %request_id,
                provider = %provider_id,
                model_used = %model_used,
                response_length = response.len(),
                "Returning selected response"
            );
            record(&state, request_id, RequestOutcome::Success);
            if let Err(e) = state.metrics().record_selected(&provider_id) {
                tracing::warn!(
                    request_id = %request_id,
                    error = %e,
                    "Metrics recording failed (request continues)"
                );
            }
            Ok(Json(ChatResponse {
                response,
                model_used,
            }))
        }
        Err(error) => {
            tracing::error!(
                request_id = %request_id,
                error = %error,
                "No provider produced a response"
            );
            record(&state, request_id, RequestOutcome::AllFailed);
            Err(AppError::AllProvidersFailed(error.to_string()))
        }
    }
}

fn record(state: &AppState, request_id: RequestId, outcome: RequestOutcome) {
    if let Err(e) = state.metrics().record_request(outcome) {
        tracing::warn!(
            request_id = %request_id,
            outcome = outcome.as_str(),
            error = %e,
            "Metrics recording failed (request continues)"
        );
    }
}

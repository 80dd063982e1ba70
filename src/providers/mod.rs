//! Provider clients and the startup-resolved provider set
//!
//! A [`ProviderClient`] performs exactly one network call per `generate` and
//! returns either the generated text or a classified [`ProviderError`].
//! Retrying is the caller's job (see [`crate::orchestration::retry`]).

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ProviderKind};
use crate::error::{AppError, AppResult, ProviderError};
use crate::orchestration::Prompt;

pub mod huggingface;
pub mod openai_chat;

pub use huggingface::HuggingFaceClient;
pub use openai_chat::OpenAiChatClient;

/// Maximum number of characters of an upstream error body kept in messages
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Leading role labels some models echo before their answer
const BOILERPLATE_PREFIXES: &[&str] = &[
    "AI response:",
    "chat response:",
    "bot response:",
    "Assistant:",
    "AI:",
    "Bot:",
];

/// One external model provider
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Perform a single generation attempt
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError>;
}

/// Identity and ordering of a configured provider
///
/// Immutable after startup. `enabled` reflects whether the provider's
/// credential was present when the [`ProviderSet`] was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    id: String,
    display_name: String,
    enabled: bool,
    priority: u32,
}

impl ProviderConfig {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Lower = preferred
    pub fn priority(&self) -> u32 {
        self.priority
    }
}

/// A configured provider together with its client, if enabled
#[derive(Clone)]
pub struct ProviderHandle {
    config: ProviderConfig,
    client: Option<Arc<dyn ProviderClient>>,
}

impl ProviderHandle {
    /// Provider with a working client
    pub fn enabled(
        id: impl Into<String>,
        display_name: impl Into<String>,
        priority: u32,
        client: Arc<dyn ProviderClient>,
    ) -> Self {
        Self {
            config: ProviderConfig {
                id: id.into(),
                display_name: display_name.into(),
                enabled: true,
                priority,
            },
            client: Some(client),
        }
    }

    /// Provider that is configured but has no credential
    pub fn disabled(id: impl Into<String>, display_name: impl Into<String>, priority: u32) -> Self {
        Self {
            config: ProviderConfig {
                id: id.into(),
                display_name: display_name.into(),
                enabled: false,
                priority,
            },
            client: None,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn client(&self) -> Option<&Arc<dyn ProviderClient>> {
        self.client.as_ref()
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Every configured provider, in configuration order
///
/// Resolved once at startup and shared read-only between requests.
#[derive(Debug, Clone, Default)]
pub struct ProviderSet {
    handles: Vec<ProviderHandle>,
}

impl ProviderSet {
    pub fn new(handles: Vec<ProviderHandle>) -> Self {
        Self { handles }
    }

    /// Resolve credentials from the process environment
    pub fn from_env(config: &Config) -> AppResult<Self> {
        Self::from_config(config, |name| std::env::var(name).ok())
    }

    /// Build clients for every provider whose credential `lookup` resolves
    ///
    /// A provider is enabled iff `lookup(api_key_env)` yields a non-blank
    /// value. Providers without one are kept as disabled entries so that
    /// `/health` can report them.
    pub fn from_config<F>(config: &Config, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut handles = Vec::with_capacity(config.providers.len());

        for endpoint in &config.providers {
            let api_key = lookup(endpoint.api_key_env()).filter(|key| !key.trim().is_empty());

            let Some(api_key) = api_key else {
                tracing::warn!(
                    provider = %endpoint.id(),
                    api_key_env = %endpoint.api_key_env(),
                    "Provider disabled: credential environment variable is not set"
                );
                handles.push(ProviderHandle::disabled(
                    endpoint.id(),
                    endpoint.display_name(),
                    endpoint.priority(),
                ));
                continue;
            };

            let client: Arc<dyn ProviderClient> = match endpoint.kind() {
                ProviderKind::HuggingFace => Arc::new(
                    HuggingFaceClient::new(endpoint, api_key).map_err(|e| {
                        AppError::Internal(format!(
                            "failed to build HTTP client for provider '{}': {}",
                            endpoint.id(),
                            e
                        ))
                    })?,
                ),
                ProviderKind::OpenAiChat => Arc::new(
                    OpenAiChatClient::new(endpoint, api_key).map_err(|e| {
                        AppError::Internal(format!(
                            "failed to build HTTP client for provider '{}': {}",
                            endpoint.id(),
                            e
                        ))
                    })?,
                ),
            };

            tracing::info!(
                provider = %endpoint.id(),
                kind = endpoint.kind().as_str(),
                model = %endpoint.model(),
                priority = endpoint.priority(),
                "Provider enabled"
            );
            handles.push(ProviderHandle::enabled(
                endpoint.id(),
                endpoint.display_name(),
                endpoint.priority(),
                client,
            ));
        }

        Ok(Self { handles })
    }

    /// All providers, enabled or not
    pub fn iter(&self) -> impl Iterator<Item = &ProviderHandle> {
        self.handles.iter()
    }

    /// Enabled providers paired with their clients, in configuration order
    pub fn enabled(&self) -> impl Iterator<Item = (&ProviderConfig, &Arc<dyn ProviderClient>)> {
        self.handles
            .iter()
            .filter_map(|h| h.client().map(|client| (h.config(), client)))
    }

    pub fn get(&self, id: &str) -> Option<&ProviderHandle> {
        self.handles.iter().find(|h| h.config().id() == id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }
}

/// Build the shared HTTP client for one provider
pub(crate) fn build_http_client(timeout_seconds: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
}

/// POST a JSON body and return the raw success body
///
/// The whole exchange, body download included, is bounded by
/// `timeout_seconds`. Non-2xx statuses are classified with [`classify_status`].
pub(crate) async fn post_json<T>(
    http: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &T,
    timeout_seconds: u64,
) -> Result<String, ProviderError>
where
    T: Serialize + Sync + ?Sized,
{
    let exchange = async {
        let response = http
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout_seconds))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout_seconds))?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }
        Ok(text)
    };

    tokio::time::timeout(Duration::from_secs(timeout_seconds), exchange)
        .await
        .map_err(|_| ProviderError::Timeout { timeout_seconds })?
}

fn transport_error(error: reqwest::Error, timeout_seconds: u64) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout { timeout_seconds }
    } else {
        ProviderError::Network {
            message: error.to_string(),
        }
    }
}

/// Classify a non-2xx provider response
///
/// 401/403 and 402 are terminal. 503, 429, a body announcing that the model
/// is still loading, and every other status are retryable.
pub fn classify_status(status: u16, body: &str) -> ProviderError {
    let message = error_message(body);

    match status {
        401 | 403 => ProviderError::Unauthorized { status, message },
        402 => ProviderError::QuotaExceeded { message },
        503 => ProviderError::ModelLoading { status, message },
        429 => ProviderError::RateLimited { message },
        _ if message.to_ascii_lowercase().contains("currently loading") => {
            ProviderError::ModelLoading { status, message }
        }
        _ => ProviderError::Upstream { status, message },
    }
}

/// Pull a readable message out of an error body
///
/// Understands `{"error": "..."}` (Hugging Face) and
/// `{"error": {"message": "..."}}` (OpenAI-compatible). Anything else is
/// returned as truncated raw text.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let extracted = parsed.as_ref().and_then(|value| match value.get("error") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(obj) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        None => None,
    });

    truncate_chars(extracted.as_deref().unwrap_or(body).trim(), MAX_ERROR_BODY_CHARS)
}

/// Truncate to at most `max_chars` characters without splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Remove leading role labels such as "AI response:" and surrounding whitespace
pub fn strip_boilerplate(text: &str) -> &str {
    let mut rest = text.trim();
    loop {
        let stripped = BOILERPLATE_PREFIXES.iter().find_map(|prefix| {
            rest.get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| rest[prefix.len()..].trim_start())
        });
        match stripped {
            Some(next) => rest = next,
            None => return rest.trim_end(),
        }
    }
}

/// Turn extracted text into a generation result, rejecting empty output
pub(crate) fn finish_text(raw: &str) -> Result<String, ProviderError> {
    let text = strip_boilerplate(raw);
    if text.is_empty() {
        return Err(ProviderError::InvalidResponse {
            message: "provider returned empty text".to_string(),
        });
    }
    Ok(text.to_string())
}

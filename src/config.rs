//! Configuration management for Yatra Sevak
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Provider credentials are not stored here: each provider names the
//! environment variable that holds its API key, and the key is resolved once
//! at startup (see [`crate::providers::ProviderSet::from_config`]).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

/// Largest accepted timeout for the server and for individual providers
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Provider id reserved for the selector's aggregate failure result
pub const RESERVED_PROVIDER_ID: &str = "none";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: Vec<ProviderEndpoint>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a whole `/chat` request, retries and backoff included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    120
}

/// Wire protocol spoken by a provider
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum ProviderKind {
    /// Hugging Face text-generation inference API
    #[serde(rename = "huggingface")]
    HuggingFace,
    /// OpenAI-compatible `/chat/completions` API (Groq, OpenAI, ...)
    #[serde(rename = "openai_chat")]
    OpenAiChat,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HuggingFace => "huggingface",
            Self::OpenAiChat => "openai_chat",
        }
    }
}

/// Provider-local "regenerate if too short" heuristic
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct QualityGate {
    /// Responses with fewer words trigger one regeneration
    pub min_words: usize,
    /// max tokens used for the regeneration call
    pub max_tokens: u32,
}

/// Individual provider configuration
///
/// All fields are private to enforce invariants. Configuration is loaded via
/// deserialization and validated via Config::validate().
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEndpoint {
    id: String,
    kind: ProviderKind,
    model: String,
    #[serde(default)]
    display_name: Option<String>,
    base_url: String,
    api_key_env: String,
    #[serde(default = "default_priority")]
    priority: u32,
    max_tokens: u32,
    #[serde(default = "default_temperature")]
    temperature: f64,
    #[serde(default = "default_top_p")]
    top_p: f64,
    #[serde(default)]
    repetition_penalty: Option<f64>,
    #[serde(default = "default_provider_timeout")]
    timeout_seconds: u64,
    #[serde(default)]
    quality_gate: Option<QualityGate>,
}

impl ProviderEndpoint {
    /// Unique provider identifier (e.g. "huggingface", "groq")
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Upstream model name sent to the provider
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Human-readable name reported as `model_used`; defaults to the model name
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.model)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Name of the environment variable holding this provider's API key
    pub fn api_key_env(&self) -> &str {
        &self.api_key_env
    }

    /// Priority (lower = preferred)
    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Nucleus-sampling threshold
    pub fn top_p(&self) -> f64 {
        self.top_p
    }

    pub fn repetition_penalty(&self) -> Option<f64> {
        self.repetition_penalty
    }

    /// Timeout for a single network call
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    pub fn quality_gate(&self) -> Option<QualityGate> {
        self.quality_gate
    }
}

fn default_priority() -> u32 {
    1
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.9
}

fn default_provider_timeout() -> u64 {
    30
}

/// Retry budget applied to every provider invocation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// First backoff delay; doubles after each retryable failure
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> usize {
    3
}

fn default_base_backoff_ms() -> u64 {
    2000
}

/// Fan-out behaviour
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrchestrationConfig {
    /// Provider invoked alone when a request sets `use_single_provider`
    #[serde(default)]
    pub single_provider: Option<String>,
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        config
            .validate()
            .map_err(|e| crate::error::AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Look up a provider by id
    pub fn provider(&self, id: &str) -> Option<&ProviderEndpoint> {
        self.providers.iter().find(|p| p.id() == id)
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()` and `from_str()`, but can
    /// also be called explicitly when constructing Config via other means.
    pub fn validate(&self) -> crate::error::AppResult<()> {
        use crate::error::AppError;

        if self.providers.is_empty() {
            return Err(AppError::Config(
                "Configuration error: no providers configured. \
                Add at least one [[providers]] section."
                    .to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(AppError::Config(
                    "Configuration error: provider id cannot be empty".to_string(),
                ));
            }
            if provider.id == RESERVED_PROVIDER_ID {
                return Err(AppError::Config(format!(
                    "Configuration error: provider id '{}' is reserved",
                    RESERVED_PROVIDER_ID
                )));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(AppError::Config(format!(
                    "Configuration error: duplicate provider id '{}'",
                    provider.id
                )));
            }
            provider.validate()?;
        }

        if let Some(single) = &self.orchestration.single_provider {
            if self.provider(single).is_none() {
                return Err(AppError::Config(format!(
                    "Configuration error: orchestration.single_provider '{}' does not match \
                    any configured provider. Available providers: {}",
                    single,
                    self.providers
                        .iter()
                        .map(|p| p.id())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "Configuration error: retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.retry.base_backoff_ms == 0 {
            return Err(AppError::Config(
                "Configuration error: retry.base_backoff_ms must be greater than 0".to_string(),
            ));
        }

        validate_timeout("server.request_timeout_seconds", self.server.request_timeout_seconds)?;

        Ok(())
    }
}

impl ProviderEndpoint {
    fn validate(&self) -> crate::error::AppResult<()> {
        use crate::error::AppError;

        if self.model.trim().is_empty() {
            return Err(AppError::Config(format!(
                "Configuration error: Provider '{}' has an empty model name",
                self.id
            )));
        }

        if self.api_key_env.trim().is_empty() {
            return Err(AppError::Config(format!(
                "Configuration error: Provider '{}' has an empty api_key_env",
                self.id
            )));
        }

        if self.priority == 0 {
            return Err(AppError::Config(format!(
                "Configuration error: Provider '{}' has priority 0. \
                priority must be a positive integer (lower = preferred).",
                self.id
            )));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Configuration error: Provider '{}' has invalid base_url '{}'. \
                base_url must start with 'http://' or 'https://'.",
                self.id, self.base_url
            )));
        }

        if self.max_tokens == 0 {
            return Err(AppError::Config(format!(
                "Configuration error: Provider '{}' has max_tokens=0. \
                max_tokens must be greater than 0.",
                self.id
            )));
        }

        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Config(format!(
                "Configuration error: Provider '{}' has invalid temperature {}. \
                temperature must be a finite number between 0.0 and 2.0.",
                self.id, self.temperature
            )));
        }

        if !self.top_p.is_finite() || self.top_p <= 0.0 || self.top_p > 1.0 {
            return Err(AppError::Config(format!(
                "Configuration error: Provider '{}' has invalid top_p {}. \
                top_p must be in (0.0, 1.0].",
                self.id, self.top_p
            )));
        }

        if let Some(penalty) = self.repetition_penalty {
            if !penalty.is_finite() || penalty <= 0.0 {
                return Err(AppError::Config(format!(
                    "Configuration error: Provider '{}' has invalid repetition_penalty {}. \
                    repetition_penalty must be a positive finite number.",
                    self.id, penalty
                )));
            }
        }

        validate_timeout(
            &format!("providers.{}.timeout_seconds", self.id),
            self.timeout_seconds,
        )?;

        if let Some(gate) = self.quality_gate {
            if self.kind != ProviderKind::HuggingFace {
                return Err(AppError::Config(format!(
                    "Configuration error: Provider '{}' sets quality_gate, which is only \
                    supported for kind = \"huggingface\"",
                    self.id
                )));
            }
            if gate.min_words == 0 || gate.max_tokens == 0 {
                return Err(AppError::Config(format!(
                    "Configuration error: Provider '{}' quality_gate requires \
                    min_words > 0 and max_tokens > 0",
                    self.id
                )));
            }
        }

        Ok(())
    }
}

fn validate_timeout(field: &str, timeout: u64) -> crate::error::AppResult<()> {
    if timeout == 0 {
        return Err(crate::error::AppError::Config(format!(
            "Configuration error: {} must be greater than 0",
            field
        )));
    }
    if timeout > MAX_TIMEOUT_SECONDS {
        return Err(crate::error::AppError::Config(format!(
            "Configuration error: {} cannot exceed {} seconds, got {}",
            field, MAX_TIMEOUT_SECONDS, timeout
        )));
    }
    Ok(())
}

impl FromStr for Config {
    type Err = crate::error::AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(toml_str).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            }
        })?;

        config.validate()?;
        Ok(config)
    }
}

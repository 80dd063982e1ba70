//! Shared test doubles for provider behaviour

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use yatra_sevak::config::Config;
use yatra_sevak::error::ProviderError;
use yatra_sevak::orchestration::Prompt;
use yatra_sevak::providers::{ProviderClient, ProviderHandle};

/// Provider that replays a script of outcomes, then repeats `fallback`
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: Result<String, ProviderError>,
    delay: Option<Duration>,
    panics: bool,
    echo: bool,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedProvider {
    pub fn always(outcome: Result<String, ProviderError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: outcome,
            delay: None,
            panics: false,
            echo: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(text: &str) -> Self {
        Self::always(Ok(text.to_string()))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::always(Err(error))
    }

    /// Replay `script` in order, then keep returning the last entry
    pub fn sequence(script: Vec<Result<String, ProviderError>>) -> Self {
        let fallback = script
            .last()
            .cloned()
            .expect("sequence needs at least one outcome");
        let mut provider = Self::always(fallback);
        provider.script = Mutex::new(script.into());
        provider
    }

    /// Answer with the transcript plus the new message, as sent to chat providers
    pub fn echo() -> Self {
        let mut provider = Self::ok("");
        provider.echo = true;
        provider
    }

    pub fn panicking() -> Self {
        let mut provider = Self::ok("");
        provider.panics = true;
        provider
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    /// Gaps between consecutive calls
    pub fn call_gaps(&self) -> Vec<Duration> {
        self.call_times()
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(Instant::now());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panics {
            panic!("scripted provider panic");
        }
        if self.echo {
            return Ok(prompt.user_content());
        }

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn handle(id: &str, priority: u32, provider: &Arc<ScriptedProvider>) -> ProviderHandle {
    ProviderHandle::enabled(id, format!("{id}-model"), priority, provider.clone())
}

pub fn loading() -> ProviderError {
    ProviderError::ModelLoading {
        status: 503,
        message: "Model is currently loading".to_string(),
    }
}

pub fn unauthorized() -> ProviderError {
    ProviderError::Unauthorized {
        status: 401,
        message: "Invalid API Key".to_string(),
    }
}

pub fn quota() -> ProviderError {
    ProviderError::QuotaExceeded {
        message: "Payment required".to_string(),
    }
}

/// Two-provider config (huggingface priority 1, groq priority 2) with a
/// configurable request timeout and retry budget
pub fn test_config(request_timeout_seconds: u64, max_attempts: usize, base_backoff_ms: u64) -> Config {
    let toml = format!(
        r#"
[server]
host = "127.0.0.1"
port = 8000
request_timeout_seconds = {request_timeout_seconds}

[retry]
max_attempts = {max_attempts}
base_backoff_ms = {base_backoff_ms}

[orchestration]
single_provider = "groq"

[[providers]]
id = "huggingface"
kind = "huggingface"
model = "mixtral"
base_url = "http://localhost:1"
api_key_env = "HF_TOKEN"
priority = 1
max_tokens = 100

[[providers]]
id = "groq"
kind = "openai_chat"
model = "llama3-8b-8192"
display_name = "groq/llama3-8b-8192"
base_url = "http://localhost:2"
api_key_env = "GROQ_API_KEY"
priority = 2
max_tokens = 100
"#
    );
    toml.parse().expect("test config should be valid")
}

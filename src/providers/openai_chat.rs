//! OpenAI-compatible chat completions client (Groq and friends)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ProviderClient, build_http_client, finish_text, post_json};
use crate::config::ProviderEndpoint;
use crate::error::ProviderError;
use crate::orchestration::Prompt;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: std::borrow::Cow<'a, str>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiChatClient {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    timeout_seconds: u64,
}

impl OpenAiChatClient {
    pub fn new(endpoint: &ProviderEndpoint, api_key: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_http_client(endpoint.timeout_seconds())?,
            url: format!(
                "{}/chat/completions",
                endpoint.base_url().trim_end_matches('/')
            ),
            model: endpoint.model().to_string(),
            api_key,
            max_tokens: endpoint.max_tokens(),
            temperature: endpoint.temperature(),
            top_p: endpoint.top_p(),
            timeout_seconds: endpoint.timeout_seconds(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// System instruction as the system message, transcript plus the new
    /// message as the user message
    fn request<'a>(&'a self, prompt: &'a Prompt) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: prompt.system().into(),
                },
                Message {
                    role: "user",
                    content: prompt.user_content().into(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        }
    }
}

#[async_trait]
impl ProviderClient for OpenAiChatClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let body = self.request(prompt);
        let raw = post_json(
            &self.http,
            &self.url,
            &self.api_key,
            &body,
            self.timeout_seconds,
        )
        .await?;

        let completion: ChatCompletionResponse =
            serde_json::from_str(&raw).map_err(|e| ProviderError::InvalidResponse {
                message: format!("malformed chat completion: {}", e),
            })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse {
                message: "chat completion has no choices[0].message.content".to_string(),
            })?;

        finish_text(&content)
    }
}

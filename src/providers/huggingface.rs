//! Hugging Face text-generation inference client
//!
//! Sends a single free-text prompt in the Mistral instruction format and
//! reads back `[{"generated_text": "..."}]`.
//!
//! When a [`QualityGate`] is configured and the answer is shorter than
//! `min_words`, the prompt is sent once more with a larger token budget. The
//! regeneration is part of one attempt: it is not seen by the retry policy,
//! and if it fails the first answer is kept.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ProviderClient, build_http_client, finish_text, post_json};
use crate::config::{ProviderEndpoint, QualityGate};
use crate::error::ProviderError;
use crate::orchestration::Prompt;

#[derive(Debug, Serialize)]
struct GenerationRequest {
    inputs: String,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f64,
    top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    repetition_penalty: Option<f64>,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}

pub struct HuggingFaceClient {
    http: reqwest::Client,
    provider_id: String,
    url: String,
    api_key: String,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    repetition_penalty: Option<f64>,
    timeout_seconds: u64,
    quality_gate: Option<QualityGate>,
}

impl HuggingFaceClient {
    pub fn new(endpoint: &ProviderEndpoint, api_key: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_http_client(endpoint.timeout_seconds())?,
            provider_id: endpoint.id().to_string(),
            url: format!(
                "{}/{}",
                endpoint.base_url().trim_end_matches('/'),
                endpoint.model()
            ),
            api_key,
            max_tokens: endpoint.max_tokens(),
            temperature: endpoint.temperature(),
            top_p: endpoint.top_p(),
            repetition_penalty: endpoint.repetition_penalty(),
            timeout_seconds: endpoint.timeout_seconds(),
            quality_gate: endpoint.quality_gate(),
        })
    }

    /// Full inference URL (`{base_url}/{model}`)
    pub fn url(&self) -> &str {
        &self.url
    }

    fn request(&self, prompt: &Prompt, max_new_tokens: u32) -> GenerationRequest {
        GenerationRequest {
            inputs: format!("<s>[INST] {} [/INST]", prompt.render()),
            parameters: GenerationParameters {
                max_new_tokens,
                temperature: self.temperature,
                top_p: self.top_p,
                repetition_penalty: self.repetition_penalty,
                do_sample: true,
                return_full_text: false,
            },
        }
    }

    async fn call(&self, prompt: &Prompt, max_new_tokens: u32) -> Result<String, ProviderError> {
        let body = self.request(prompt, max_new_tokens);
        let raw = post_json(
            &self.http,
            &self.url,
            &self.api_key,
            &body,
            self.timeout_seconds,
        )
        .await?;

        let generations: Vec<Generation> =
            serde_json::from_str(&raw).map_err(|e| ProviderError::InvalidResponse {
                message: format!("expected [{{\"generated_text\": ...}}]: {}", e),
            })?;

        let first = generations
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse {
                message: "empty generation list".to_string(),
            })?;

        finish_text(&first.generated_text)
    }
}

#[async_trait]
impl ProviderClient for HuggingFaceClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let text = self.call(prompt, self.max_tokens).await?;

        let Some(gate) = self.quality_gate else {
            return Ok(text);
        };

        let words = word_count(&text);
        if words >= gate.min_words {
            return Ok(text);
        }

        tracing::debug!(
            provider = %self.provider_id,
            words,
            min_words = gate.min_words,
            max_tokens = gate.max_tokens,
            "Response below quality gate, regenerating"
        );

        match self.call(prompt, gate.max_tokens).await {
            Ok(longer) => Ok(longer),
            Err(e) => {
                tracing::warn!(
                    provider = %self.provider_id,
                    error = %e,
                    "Quality-gate regeneration failed, keeping first response"
                );
                Ok(text)
            }
        }
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::orchestration::{ChatTurn, PromptMode};
    use std::str::FromStr;

    fn endpoint(extra: &str) -> ProviderEndpoint {
        let toml = format!(
            r#"
[server]
host = "127.0.0.1"
port = 8000

[[providers]]
id = "huggingface"
kind = "huggingface"
model = "mistralai/Mixtral-8x7B-Instruct-v0.1"
base_url = "https://api-inference.huggingface.co/models/"
api_key_env = "HF_TOKEN"
max_tokens = 1500
{}
"#,
            extra
        );
        Config::from_str(&toml).unwrap().providers.remove(0)
    }

    fn prompt() -> Prompt {
        Prompt::build(PromptMode::Regular, &[] as &[ChatTurn], "Plan a trip to Jaipur").unwrap()
    }

    #[test]
    fn test_url_joins_base_and_model() {
        let client = HuggingFaceClient::new(&endpoint(""), "hf_x".to_string()).unwrap();
        assert_eq!(
            client.url(),
            "https://api-inference.huggingface.co/models/mistralai/Mixtral-8x7B-Instruct-v0.1"
        );
    }

    #[test]
    fn test_request_payload_shape() {
        let client =
            HuggingFaceClient::new(&endpoint("repetition_penalty = 1.3"), "k".to_string()).unwrap();
        let value = serde_json::to_value(client.request(&prompt(), 1500)).unwrap();

        let inputs = value["inputs"].as_str().unwrap();
        assert!(inputs.starts_with("<s>[INST] "));
        assert!(inputs.ends_with(" [/INST]"));
        assert!(inputs.contains("User: Plan a trip to Jaipur"));

        let params = &value["parameters"];
        assert_eq!(params["max_new_tokens"], 1500);
        assert_eq!(params["temperature"], 0.7);
        assert_eq!(params["top_p"], 0.9);
        assert_eq!(params["repetition_penalty"], 1.3);
        assert_eq!(params["do_sample"], true);
        assert_eq!(params["return_full_text"], false);
    }

    #[test]
    fn test_repetition_penalty_omitted_when_unset() {
        let client = HuggingFaceClient::new(&endpoint(""), "k".to_string()).unwrap();
        let value = serde_json::to_value(client.request(&prompt(), 10)).unwrap();
        assert!(value["parameters"].get("repetition_penalty").is_none());
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("one two\nthree   four"), 4);
        assert_eq!(word_count(""), 0);
    }
}

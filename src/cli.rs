//! Command-line interface for Yatra Sevak

use clap::{Parser, Subcommand};

/// Multi-provider LLM chat gateway for the Yatra Sevak travel assistant
#[derive(Parser)]
#[command(name = "yatra-sevak")]
#[command(version)]
#[command(about = "Multi-provider LLM chat gateway for the Yatra Sevak travel assistant")]
#[command(
    long_about = "Yatra Sevak forwards travel-assistant chat messages to every configured \
    hosted LLM provider, retries transient failures, and returns the answer of the \
    highest-priority provider that succeeded."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Template configuration with the Hugging Face and Groq providers
pub fn generate_config_template() -> &'static str {
    r#"# Yatra Sevak Configuration
# ==========================
#
# API keys are never stored in this file. Each provider names the environment
# variable holding its key; providers whose variable is unset or empty are
# reported as "not configured" on /health and skipped.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"
port = 8000

# Upper bound on one /chat request, retries and backoff included (max 300)
request_timeout_seconds = 120

# ─────────────────────────────────────────────────────────────────────────────
# RETRIES
# ─────────────────────────────────────────────────────────────────────────────

[retry]
# Attempts per provider per request
max_attempts = 3

# First backoff delay; doubles after each retryable failure (capped at 30s)
base_backoff_ms = 2000

# ─────────────────────────────────────────────────────────────────────────────
# ORCHESTRATION
# ─────────────────────────────────────────────────────────────────────────────

[orchestration]
# Provider queried alone when a request sets use_single_provider (or use_groq).
# Falls back to querying every provider if it is disabled.
single_provider = "groq"

# ─────────────────────────────────────────────────────────────────────────────
# PROVIDERS
# ─────────────────────────────────────────────────────────────────────────────
#
# Every enabled provider is queried concurrently. Among the ones that succeed,
# the lowest priority value wins.
#
#   kind: "huggingface" (text-generation inference) or
#         "openai_chat" (OpenAI-compatible /chat/completions)

[[providers]]
id = "huggingface"
kind = "huggingface"
model = "mistralai/Mixtral-8x7B-Instruct-v0.1"
base_url = "https://api-inference.huggingface.co/models"
api_key_env = "HUGGINGFACEHUB_API_TOKEN"
priority = 1
max_tokens = 1500
temperature = 0.7
top_p = 0.9
repetition_penalty = 1.3
timeout_seconds = 60

# Regenerate once with a larger budget when the answer is too short
[providers.quality_gate]
min_words = 200
max_tokens = 8000

[[providers]]
id = "groq"
kind = "openai_chat"
model = "llama3-8b-8192"
display_name = "groq/llama3-8b-8192"
base_url = "https://api.groq.com/openai/v1"
api_key_env = "GROQ_API_KEY"
priority = 2
max_tokens = 2000
temperature = 0.7
top_p = 0.9
timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG overrides)
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}

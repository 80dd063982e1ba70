//! Multi-provider query orchestration
//!
//! Request flow:
//! 1. [`Prompt::build`] flattens the chat into one provider-agnostic prompt
//! 2. [`Orchestrator::run`] invokes every enabled provider concurrently, each
//!    under the [`RetryPolicy`], and collects a [`ResultBatch`]
//! 3. [`select`] picks the answer of the highest-priority success

use crate::error::ProviderError;

pub mod fan_out;
pub mod prompt;
pub mod retry;
pub mod selector;

pub use fan_out::Orchestrator;
pub use prompt::{ChatTurn, MAX_PROMPT_CHARS, Prompt, PromptMode, Sender};
pub use retry::{MAX_BACKOFF_MS, RetryPolicy};
pub use selector::select;

/// The parts of one chat request the orchestrator acts on
#[derive(Debug, Clone, Copy)]
pub struct ChatQuery<'a> {
    message: &'a str,
    history: &'a [ChatTurn],
    use_single_provider: bool,
}

impl<'a> ChatQuery<'a> {
    pub fn new(message: &'a str, history: &'a [ChatTurn]) -> Self {
        Self {
            message,
            history,
            use_single_provider: false,
        }
    }

    /// Route to the configured single provider with the customization prompt
    pub fn with_single_provider(mut self, use_single_provider: bool) -> Self {
        self.use_single_provider = use_single_provider;
        self
    }

    pub fn message(&self) -> &'a str {
        self.message
    }

    /// Prior turns, oldest first
    pub fn history(&self) -> &'a [ChatTurn] {
        self.history
    }

    pub fn use_single_provider(&self) -> bool {
        self.use_single_provider
    }
}

/// Outcome of one provider invocation, retries included
///
/// Created once per provider per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    provider_id: String,
    display_name: String,
    priority: u32,
    attempts: u32,
    outcome: Result<String, ProviderError>,
}

impl QueryResult {
    pub fn new(
        provider_id: impl Into<String>,
        display_name: impl Into<String>,
        priority: u32,
        attempts: u32,
        outcome: Result<String, ProviderError>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            display_name: display_name.into(),
            priority,
            attempts,
            outcome,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Number of network attempts made (0 when the invocation panicked)
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn outcome(&self) -> &Result<String, ProviderError> {
        &self.outcome
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn text(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&ProviderError> {
        self.outcome.as_ref().err()
    }

    pub fn into_outcome(self) -> Result<String, ProviderError> {
        self.outcome
    }
}

/// Results of one orchestration run, in invocation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultBatch {
    results: Vec<QueryResult>,
}

impl ResultBatch {
    pub fn new(results: Vec<QueryResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryResult> {
        self.results.iter()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn into_vec(self) -> Vec<QueryResult> {
        self.results
    }
}

impl IntoIterator for ResultBatch {
    type Item = QueryResult;
    type IntoIter = std::vec::IntoIter<QueryResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultBatch {
    type Item = &'a QueryResult;
    type IntoIter = std::slice::Iter<'a, QueryResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

impl FromIterator<QueryResult> for ResultBatch {
    fn from_iter<I: IntoIterator<Item = QueryResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

//! Concurrent fan-out over the enabled providers

use futures::FutureExt;
use futures::future::join_all;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::{ChatQuery, Prompt, PromptMode, QueryResult, ResultBatch, RetryPolicy};
use crate::error::{AppResult, ProviderError};
use crate::metrics::{Metrics, ProviderOutcome};
use crate::middleware::RequestId;
use crate::providers::{ProviderClient, ProviderConfig, ProviderSet};

type Target<'a> = (&'a ProviderConfig, &'a Arc<dyn ProviderClient>);

/// Invokes providers for one chat request and collects every outcome
///
/// Holds no per-request state; one instance serves all requests. Provider
/// calls run on the caller's task, so dropping the future returned by
/// [`run`](Self::run) cancels every in-flight call and backoff.
pub struct Orchestrator {
    providers: Arc<ProviderSet>,
    retry: RetryPolicy,
    single_provider: Option<String>,
    metrics: Arc<Metrics>,
}

impl Orchestrator {
    pub fn new(
        providers: Arc<ProviderSet>,
        retry: RetryPolicy,
        single_provider: Option<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            providers,
            retry,
            single_provider,
            metrics,
        }
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn single_provider(&self) -> Option<&str> {
        self.single_provider.as_deref()
    }

    /// Query the providers for `query`
    ///
    /// Returns one [`QueryResult`] per invoked provider, in configuration
    /// order. Provider failures and panics are folded into the batch; the
    /// only error is a prompt that cannot be built.
    pub async fn run(&self, query: ChatQuery<'_>, request_id: RequestId) -> AppResult<ResultBatch> {
        let mode = if query.use_single_provider() {
            PromptMode::Customize
        } else {
            PromptMode::Regular
        };
        let prompt = Prompt::build(mode, query.history(), query.message())?;

        let targets: Vec<Target<'_>> = match query
            .use_single_provider()
            .then(|| self.single_target(request_id))
            .flatten()
        {
            Some(target) => vec![target],
            None => self.providers.enabled().collect(),
        };

        tracing::info!(
            request_id = %request_id,
            mode = mode.as_str(),
            provider_count = targets.len(),
            prompt_chars = prompt.char_count(),
            "Invoking providers"
        );

        let prompt = &prompt;
        let invocations = targets.into_iter().map(|(config, client)| async move {
            AssertUnwindSafe(self.retry.invoke(config, client.as_ref(), prompt, request_id))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(
                        request_id = %request_id,
                        provider = %config.id(),
                        panic = %message,
                        "Provider invocation panicked"
                    );
                    QueryResult::new(
                        config.id(),
                        config.display_name(),
                        config.priority(),
                        0,
                        Err(ProviderError::TaskFailed { message }),
                    )
                })
        });

        let batch: ResultBatch = join_all(invocations).await.into_iter().collect();

        tracing::info!(
            request_id = %request_id,
            results = batch.len(),
            successes = batch.success_count(),
            "Provider fan-out complete"
        );
        self.record(&batch, request_id);

        Ok(batch)
    }

    /// The configured single provider, if it exists and is enabled
    fn single_target(&self, request_id: RequestId) -> Option<Target<'_>> {
        let Some(id) = self.single_provider.as_deref() else {
            tracing::warn!(
                request_id = %request_id,
                "Single-provider mode requested but none is configured, falling back to fan-out"
            );
            return None;
        };

        let target = self
            .providers
            .get(id)
            .and_then(|handle| handle.client().map(|client| (handle.config(), client)));

        if target.is_none() {
            tracing::warn!(
                request_id = %request_id,
                provider = %id,
                "Single provider is disabled, falling back to fan-out"
            );
        }
        target
    }

    fn record(&self, batch: &ResultBatch, request_id: RequestId) {
        for result in batch {
            if let Err(e) = self.metrics.record_provider_result(
                result.provider_id(),
                ProviderOutcome::from_result(result.outcome()),
                result.attempts(),
            ) {
                tracing::warn!(
                    request_id = %request_id,
                    provider = %result.provider_id(),
                    error = %e,
                    "Metrics recording failed (request continues)"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "provider task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extracts_str_and_string() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(boxed.as_ref()), "owned boom");

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "provider task panicked");
    }
}

//! Prometheus metrics for the chat gateway
//!
//! Tracks:
//! - Chat requests by final outcome
//! - Provider results by provider id and outcome (success or error kind)
//! - Provider call attempts, retries included
//! - Which provider won selection
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::error::ProviderError;

/// Final outcome of a `/chat` request
///
/// Restricting the label to a closed enum keeps cardinality fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    AllFailed,
    Timeout,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Success => "success",
            RequestOutcome::AllFailed => "all_failed",
            RequestOutcome::Timeout => "timeout",
        }
    }
}

/// Outcome label for one provider invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOutcome {
    Success,
    /// Failure, labelled with [`ProviderError::kind`]
    Failed(&'static str),
}

impl ProviderOutcome {
    pub fn from_result(outcome: &Result<String, ProviderError>) -> Self {
        match outcome {
            Ok(_) => Self::Success,
            Err(e) => Self::Failed(e.kind()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderOutcome::Success => "success",
            ProviderOutcome::Failed(kind) => kind,
        }
    }
}

/// Metrics collector
///
/// Cheap to clone; all clones share one registry. Provider labels are
/// configured provider ids, so cardinality is bounded by the config file.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    chat_requests: IntCounterVec,
    provider_results: IntCounterVec,
    provider_attempts: IntCounterVec,
    selected_provider: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance with its own registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let chat_requests = IntCounterVec::new(
            Opts::new(
                "yatra_chat_requests_total",
                "Total number of chat requests by outcome",
            ),
            &["outcome"],
        )?;

        let provider_results = IntCounterVec::new(
            Opts::new(
                "yatra_provider_results_total",
                "Provider invocation results by provider and outcome (success or error kind)",
            ),
            &["provider", "outcome"],
        )?;

        let provider_attempts = IntCounterVec::new(
            Opts::new(
                "yatra_provider_attempts_total",
                "Provider call attempts, retries included",
            ),
            &["provider"],
        )?;

        // Never incremented for the "none" aggregate failure.
        let selected_provider = IntCounterVec::new(
            Opts::new(
                "yatra_selected_provider_total",
                "Number of times each provider's answer was returned to the caller",
            ),
            &["provider"],
        )?;

        registry.register(Box::new(chat_requests.clone()))?;
        registry.register(Box::new(provider_results.clone()))?;
        registry.register(Box::new(provider_attempts.clone()))?;
        registry.register(Box::new(selected_provider.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            chat_requests,
            provider_results,
            provider_attempts,
            selected_provider,
        })
    }

    pub fn record_request(&self, outcome: RequestOutcome) -> Result<(), prometheus::Error> {
        self.chat_requests
            .get_metric_with_label_values(&[outcome.as_str()])?
            .inc();
        Ok(())
    }

    /// Record one provider's final result and how many attempts it took
    pub fn record_provider_result(
        &self,
        provider: &str,
        outcome: ProviderOutcome,
        attempts: u32,
    ) -> Result<(), prometheus::Error> {
        self.provider_results
            .get_metric_with_label_values(&[provider, outcome.as_str()])?
            .inc();
        self.provider_attempts
            .get_metric_with_label_values(&[provider])?
            .inc_by(u64::from(attempts));
        Ok(())
    }

    pub fn record_selected(&self, provider: &str) -> Result<(), prometheus::Error> {
        self.selected_provider
            .get_metric_with_label_values(&[provider])?
            .inc();
        Ok(())
    }

    /// Current value of `yatra_chat_requests_total{outcome}`
    pub fn requests_count(&self, outcome: RequestOutcome) -> u64 {
        self.chat_requests
            .get_metric_with_label_values(&[outcome.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current value of `yatra_provider_attempts_total{provider}`
    pub fn attempts_count(&self, provider: &str) -> u64 {
        self.provider_attempts
            .get_metric_with_label_values(&[provider])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current value of `yatra_selected_provider_total{provider}`
    pub fn selected_count(&self, provider: &str) -> u64 {
        self.selected_provider
            .get_metric_with_label_values(&[provider])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Gather all metrics in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        tracing::debug!(
            metric_family_count = metric_families.len(),
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(error = %e, "Prometheus text encoder failed");
                e
            })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new_registers_all_families() {
        let metrics = Metrics::new().expect("Failed to create metrics");

        metrics.record_request(RequestOutcome::Success).unwrap();
        metrics
            .record_provider_result("groq", ProviderOutcome::Success, 1)
            .unwrap();
        metrics.record_selected("groq").unwrap();

        let names: Vec<String> = metrics
            .registry
            .gather()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names.len(), 4);
        assert!(names.contains(&"yatra_chat_requests_total".to_string()));
        assert!(names.contains(&"yatra_provider_results_total".to_string()));
        assert!(names.contains(&"yatra_provider_attempts_total".to_string()));
        assert!(names.contains(&"yatra_selected_provider_total".to_string()));
    }

    #[test]
    fn test_record_provider_result_counts_attempts() {
        let metrics = Metrics::new().unwrap();
        metrics
            .record_provider_result("huggingface", ProviderOutcome::Failed("model_loading"), 3)
            .unwrap();
        metrics
            .record_provider_result("huggingface", ProviderOutcome::Success, 1)
            .unwrap();

        assert_eq!(metrics.attempts_count("huggingface"), 4);
        assert_eq!(metrics.attempts_count("groq"), 0);
    }

    #[test]
    fn test_provider_outcome_uses_error_kind() {
        let failed: Result<String, ProviderError> = Err(ProviderError::QuotaExceeded {
            message: "pay up".to_string(),
        });
        assert_eq!(ProviderOutcome::from_result(&failed).as_str(), "billing");
        assert_eq!(
            ProviderOutcome::from_result(&Ok("hi".to_string())).as_str(),
            "success"
        );
    }

    #[test]
    fn test_request_outcome_labels() {
        assert_eq!(RequestOutcome::Success.as_str(), "success");
        assert_eq!(RequestOutcome::AllFailed.as_str(), "all_failed");
        assert_eq!(RequestOutcome::Timeout.as_str(), "timeout");
    }

    #[test]
    fn test_gather_produces_prometheus_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request(RequestOutcome::AllFailed).unwrap();
        metrics.record_selected("huggingface").unwrap();

        let output = metrics.gather().expect("gather should succeed");
        assert!(output.contains("# TYPE yatra_chat_requests_total counter"));
        assert!(output.contains(r#"yatra_chat_requests_total{outcome="all_failed"} 1"#));
        assert!(output.contains(r#"yatra_selected_provider_total{provider="huggingface"} 1"#));
    }

    #[test]
    fn test_metrics_clones_share_registry() {
        let metrics = Metrics::new().unwrap();
        let clone = metrics.clone();
        clone.record_request(RequestOutcome::Timeout).unwrap();
        assert_eq!(metrics.requests_count(RequestOutcome::Timeout), 1);
    }

    #[test]
    fn test_concurrent_recording_is_consistent() {
        let metrics = Metrics::new().unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_selected("groq").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.selected_count("groq"), 800);
    }
}

//! Bounded retries with exponential backoff
//!
//! Each provider invocation gets up to `max_attempts` calls. Terminal errors
//! stop immediately; retryable ones wait `base * 2^(attempt-1)` milliseconds
//! (capped at [`MAX_BACKOFF_MS`]) before the next call. There is never a wait
//! after the final attempt.

use std::time::Duration;

use super::{Prompt, QueryResult};
use crate::config::RetryConfig;
use crate::error::ProviderError;
use crate::middleware::RequestId;
use crate::providers::{ProviderClient, ProviderConfig};

/// Maximum backoff duration in milliseconds (30 seconds)
pub const MAX_BACKOFF_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff_ms: u64,
}

impl RetryPolicy {
    /// # Errors
    /// Returns an error if `max_attempts` is 0 (at least 1 attempt is required)
    /// or `base_backoff_ms` is 0 (delays must grow between attempts)
    pub fn new(max_attempts: u32, base_backoff_ms: u64) -> Result<Self, &'static str> {
        if max_attempts == 0 {
            return Err("max_attempts must be at least 1");
        }
        if base_backoff_ms == 0 {
            return Err("base_backoff_ms must be greater than 0");
        }
        Ok(Self {
            max_attempts,
            base_backoff_ms,
        })
    }

    pub fn from_config(config: &RetryConfig) -> Result<Self, &'static str> {
        let max_attempts = u32::try_from(config.max_attempts).unwrap_or(u32::MAX);
        Self::new(max_attempts, config.base_backoff_ms)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_backoff_ms(&self) -> u64 {
        self.base_backoff_ms
    }

    /// Delay after failed attempt `attempt` (1-indexed)
    ///
    /// With base=2000ms: 2s, 4s, 8s, 16s, then 30s (capped).
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1);
        self.base_backoff_ms
            .saturating_mul(2_u64.saturating_pow(exponent))
            .min(MAX_BACKOFF_MS)
    }

    /// Run one provider to completion and fold the outcome into a [`QueryResult`]
    pub async fn invoke(
        &self,
        provider: &ProviderConfig,
        client: &dyn ProviderClient,
        prompt: &Prompt,
        request_id: RequestId,
    ) -> QueryResult {
        let mut attempt = 0;

        let outcome: Result<String, ProviderError> = loop {
            attempt += 1;

            let result = client.generate(prompt).await;

            let error = match result {
                Ok(text) => {
                    tracing::info!(
                        request_id = %request_id,
                        provider = %provider.id(),
                        attempt,
                        max_attempts = self.max_attempts,
                        outcome = "success",
                        response_length = text.len(),
                        "Provider attempt succeeded"
                    );
                    break Ok(text);
                }
                Err(e) => e,
            };

            if error.is_terminal() {
                tracing::warn!(
                    request_id = %request_id,
                    provider = %provider.id(),
                    attempt,
                    max_attempts = self.max_attempts,
                    outcome = error.kind(),
                    status = ?error.status(),
                    error = %error,
                    "Provider attempt failed with terminal error, not retrying"
                );
                break Err(error);
            }

            if attempt >= self.max_attempts {
                tracing::warn!(
                    request_id = %request_id,
                    provider = %provider.id(),
                    attempt,
                    max_attempts = self.max_attempts,
                    outcome = error.kind(),
                    status = ?error.status(),
                    error = %error,
                    "Provider attempt failed, retry budget exhausted"
                );
                break Err(error);
            }

            let backoff_ms = self.backoff_ms(attempt);
            tracing::warn!(
                request_id = %request_id,
                provider = %provider.id(),
                attempt,
                max_attempts = self.max_attempts,
                outcome = error.kind(),
                status = ?error.status(),
                backoff_ms,
                error = %error,
                "Provider attempt failed, retrying after backoff"
            );
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        };

        QueryResult::new(
            provider.id(),
            provider.display_name(),
            provider.priority(),
            attempt,
            outcome,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(RetryPolicy::new(0, 100).is_err());
        assert!(RetryPolicy::new(1, 100).is_ok());
    }

    #[test]
    fn test_zero_base_backoff_rejected() {
        assert!(RetryPolicy::new(3, 0).is_err());
        assert!(RetryPolicy::new(3, 1).is_ok());
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let policy = RetryPolicy::new(5, 2000).unwrap();
        assert_eq!(policy.backoff_ms(1), 2000);
        assert_eq!(policy.backoff_ms(2), 4000);
        assert_eq!(policy.backoff_ms(3), 8000);
        assert_eq!(policy.backoff_ms(4), 16_000);
        assert_eq!(policy.backoff_ms(5), MAX_BACKOFF_MS);
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(3, u64::MAX).unwrap();
        assert_eq!(policy.backoff_ms(70), MAX_BACKOFF_MS);
        assert_eq!(RetryPolicy::new(3, 1).unwrap().backoff_ms(10), 512);
    }

    #[test]
    fn test_default_matches_config_defaults() {
        let from_config = RetryPolicy::from_config(&RetryConfig::default()).unwrap();
        assert_eq!(from_config, RetryPolicy::default());
        assert_eq!(from_config.max_attempts(), 3);
        assert_eq!(from_config.base_backoff_ms(), 2000);
    }
}

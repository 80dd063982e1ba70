//! Response selection
//!
//! Picks one answer from a [`ResultBatch`] by static priority. Selection is
//! content-blind: response text is never inspected.

use super::{QueryResult, ResultBatch};
use crate::config::RESERVED_PROVIDER_ID;
use crate::error::ProviderError;

/// Pick the winning result
///
/// - No successes (or an empty batch): an aggregate failure with provider id
///   `"none"`, listing every `provider: error` pair in batch order.
/// - Otherwise the success with the lowest priority value. Ties keep batch
///   order.
pub fn select(batch: ResultBatch) -> QueryResult {
    let (mut successes, failures): (Vec<QueryResult>, Vec<QueryResult>) =
        batch.into_iter().partition(QueryResult::is_success);

    if successes.is_empty() {
        return aggregate_failure(&failures);
    }

    // stable: equal priorities stay in invocation order
    successes.sort_by_key(QueryResult::priority);
    successes.swap_remove(0)
}

fn aggregate_failure(failures: &[QueryResult]) -> QueryResult {
    let summary = failures
        .iter()
        .filter_map(|r| r.error().map(|e| format!("{}: {}", r.provider_id(), e)))
        .collect::<Vec<_>>()
        .join("; ");

    let summary = if summary.is_empty() {
        "no providers are enabled".to_string()
    } else {
        summary
    };

    QueryResult::new(
        RESERVED_PROVIDER_ID,
        RESERVED_PROVIDER_ID,
        u32::MAX,
        0,
        Err(ProviderError::AllProvidersFailed { summary }),
    )
}

#[cfg(test)]
mod tests_failure;
#[cfg(test)]
mod tests_priority;

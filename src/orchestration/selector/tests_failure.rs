//! Aggregate failure when nothing succeeded

use super::test_support::{err, upstream};
use super::*;
use proptest::prelude::*;

#[test]
fn test_all_failed_names_every_provider_and_error_kind() {
    let batch = ResultBatch::new(vec![
        err(
            "huggingface",
            1,
            ProviderError::QuotaExceeded {
                message: "subscription required".to_string(),
            },
        ),
        err(
            "groq",
            2,
            ProviderError::Unauthorized {
                status: 401,
                message: "Invalid API Key".to_string(),
            },
        ),
    ]);

    let result = select(batch);

    assert!(!result.is_success());
    assert_eq!(result.provider_id(), "none");
    assert_eq!(result.display_name(), "none");

    let message = result.error().unwrap().to_string();
    assert_eq!(
        message,
        "All providers failed. Errors: \
        huggingface: billing or quota exceeded (HTTP 402): subscription required; \
        groq: authentication failed (HTTP 401): Invalid API Key"
    );
}

#[test]
fn test_empty_batch_is_aggregate_failure() {
    let result = select(ResultBatch::default());
    assert_eq!(result.provider_id(), "none");
    assert!(matches!(
        result.error(),
        Some(ProviderError::AllProvidersFailed { summary }) if summary == "no providers are enabled"
    ));
}

#[test]
fn test_failure_summary_keeps_batch_order() {
    let batch = ResultBatch::new(vec![err("b", 2, upstream(500)), err("a", 1, upstream(502))]);
    let message = select(batch).error().unwrap().to_string();
    let b = message.find("b: ").unwrap();
    let a = message.find("a: ").unwrap();
    assert!(b < a);
}

proptest! {
    #[test]
    fn prop_failure_message_contains_every_error(
        statuses in prop::collection::vec(400u16..600, 1..8)
    ) {
        let results: Vec<QueryResult> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| err(&format!("provider{i}"), 1, upstream(*status)))
            .collect();
        let expected: Vec<String> = results
            .iter()
            .map(|r| format!("{}: {}", r.provider_id(), r.error().unwrap()))
            .collect();

        let message = select(ResultBatch::new(results)).error().unwrap().to_string();

        for part in expected {
            prop_assert!(message.contains(&part), "missing {:?} in {:?}", part, message);
        }
    }
}

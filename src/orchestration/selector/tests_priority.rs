//! Priority ordering among successful results

use super::test_support::{err, ok, upstream};
use super::*;
use proptest::prelude::*;

#[test]
fn test_single_success_returned_unchanged() {
    let only = ok("groq", 2, "Paris is lovely");
    let batch = ResultBatch::new(vec![err("huggingface", 1, upstream(500)), only.clone()]);
    assert_eq!(select(batch), only);
}

#[test]
fn test_lowest_priority_value_wins() {
    let batch = ResultBatch::new(vec![
        ok("groq", 2, "from groq"),
        ok("huggingface", 1, "from hf"),
    ]);
    let winner = select(batch);
    assert_eq!(winner.provider_id(), "huggingface");
    assert_eq!(winner.text(), Some("from hf"));
}

#[test]
fn test_priority_ties_keep_batch_order() {
    let batch = ResultBatch::new(vec![
        ok("first", 1, "a"),
        ok("second", 1, "b"),
        ok("third", 1, "c"),
    ]);
    assert_eq!(select(batch).provider_id(), "first");
}

#[test]
fn test_selection_ignores_text_content() {
    let batch = ResultBatch::new(vec![
        ok("short", 1, "ok"),
        ok("long", 2, &"much more detailed answer ".repeat(100)),
    ]);
    assert_eq!(select(batch).provider_id(), "short");
}

proptest! {
    #[test]
    fn prop_winner_has_minimum_priority(
        entries in prop::collection::vec((1u32..10, any::<bool>()), 1..12)
    ) {
        let results: Vec<QueryResult> = entries
            .iter()
            .enumerate()
            .map(|(i, (priority, success))| {
                let id = format!("p{i}");
                if *success {
                    ok(&id, *priority, "text")
                } else {
                    err(&id, *priority, upstream(502))
                }
            })
            .collect();

        let min_success = entries
            .iter()
            .filter(|(_, success)| *success)
            .map(|(priority, _)| *priority)
            .min();

        let winner = select(ResultBatch::new(results));

        match min_success {
            Some(min) => {
                prop_assert!(winner.is_success());
                prop_assert_eq!(winner.priority(), min);
            }
            None => {
                prop_assert!(!winner.is_success());
                prop_assert_eq!(winner.provider_id(), "none");
            }
        }
    }

    #[test]
    fn prop_insertion_order_does_not_change_winner(
        priorities in prop::collection::hash_set(1u32..1000, 1..10),
        rotation in 0usize..10
    ) {
        let mut results: Vec<QueryResult> = priorities
            .iter()
            .map(|p| ok(&format!("p{p}"), *p, "text"))
            .collect();
        let expected = *priorities.iter().min().unwrap();

        let len = results.len();
        results.rotate_left(rotation % len);

        prop_assert_eq!(select(ResultBatch::new(results)).priority(), expected);
    }
}

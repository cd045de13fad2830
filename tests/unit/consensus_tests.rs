/*!
 * Tests for arbitration between readings
 */

use std::sync::Arc;

use subconvert::consensus::{ConsensusArbiter, ReadingMatcher, reconcile_line_groups};
use subconvert::text_line::TextLine;

use crate::common::DictionarySpellValidator;

fn readings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn shown(text: &str, start: f64, end: f64) -> TextLine {
    TextLine::new(text, start, end).with_geometry(60, 700, 700, 80)
}

#[tokio::test]
async fn test_arbitrate_withIdenticalReadings_shouldReturnReadingUnchanged() {
    let validator = Arc::new(DictionarySpellValidator::new(&[]));
    let arbiter = ConsensusArbiter::new(Some(validator.clone()));

    let result = arbiter.arbitrate(&readings(&["It's fine.", "It's fine.", "It's fine."])).await;

    assert_eq!(result, "It's fine.");
    assert_eq!(validator.calls(), 0, "unanimous readings never reach the validator");
}

#[tokio::test]
async fn test_arbitrate_withQuoteVariants_shouldFoldToAscii() {
    let arbiter = ConsensusArbiter::new(None);
    let result = arbiter.arbitrate(&readings(&["It\u{2019}s", "It's", "It\u{2018}s"])).await;
    assert_eq!(result, "It's");
}

#[tokio::test]
async fn test_arbitrate_withDashVariants_shouldTakeMajority() {
    let arbiter = ConsensusArbiter::new(None);
    let result = arbiter
        .arbitrate(&readings(&[
            "F-f-f-f-f...",
            "F\u{2014}f-f-f-f...",
            "F--f-f-f...",
            "F-f-f-f-f...",
            "F-f-f-f-f...",
            "F-f-f-f-f...",
        ]))
        .await;
    assert_eq!(result, "F-f-f-f-f...");
}

#[tokio::test]
async fn test_arbitrate_withValidator_shouldPreferValidCandidate() {
    let validator = Arc::new(DictionarySpellValidator::new(&["hello", "world"]));
    let arbiter = ConsensusArbiter::new(Some(validator.clone()));

    // Frequency alone would keep the first-seen misreading
    let result = arbiter.arbitrate(&readings(&["Hello wrold", "Hello world"])).await;

    assert_eq!(result, "Hello world");
    assert_eq!(validator.calls(), 1);
}

#[tokio::test]
async fn test_arbitrate_withoutValidator_shouldKeepFirstSeenOnTie() {
    let arbiter = ConsensusArbiter::new(None);
    let result = arbiter.arbitrate(&readings(&["Hello wrold", "Hello world"])).await;
    assert_eq!(result, "Hello wrold");
}

#[tokio::test]
async fn test_arbitrate_withBrokenValidator_shouldFallBackToMajority() {
    let validator = Arc::new(DictionarySpellValidator::broken());
    let arbiter = ConsensusArbiter::new(Some(validator.clone()));

    let first = arbiter.arbitrate(&readings(&["a cat", "a cot", "a cat"])).await;
    let second = arbiter.arbitrate(&readings(&["the dog", "the dag", "the dog"])).await;

    assert_eq!(first, "a cat");
    assert_eq!(second, "the dog");
    assert_eq!(validator.calls(), 2, "the validator is still tried on every call");
}

#[tokio::test]
async fn test_arbitrateMany_shouldBatchIntoOneValidatorCall() {
    let validator = Arc::new(DictionarySpellValidator::new(&["good", "morning", "night"]));
    let arbiter = ConsensusArbiter::new(Some(validator.clone()));

    let results = arbiter
        .arbitrate_many(&[
            readings(&["Good mornmg", "Good morning"]),
            readings(&["Same", "Same"]),
            readings(&["Good nlght", "Good night"]),
        ])
        .await;

    assert_eq!(results, vec!["Good morning", "Same", "Good night"]);
    assert_eq!(validator.calls(), 1);
}

#[test]
fn test_readingMatcher_shouldToleratePartialMisreads() {
    let matcher = ReadingMatcher::default();
    assert!(matcher.same_reading("Hello wrold", "Hello world"));
    assert!(!matcher.same_reading("Hello world", "Goodbye"));
}

#[tokio::test]
async fn test_reconcileLineGroups_withMisreadFrame_shouldUnifyGroup() {
    let validator = Arc::new(DictionarySpellValidator::new(&["see", "you", "tomorrow"]));
    let arbiter = ConsensusArbiter::new(Some(validator));
    let mut lines = vec![
        shown("See you tomorow", 0.0, 0.1),
        shown("See you tomorrow", 0.1, 0.2),
        shown("See you tomorrow", 0.2, 0.3),
        shown("Something else entirely", 0.3, 0.4),
    ];

    let changed = reconcile_line_groups(&mut lines, &arbiter, &ReadingMatcher::default(), 0.1).await;

    assert_eq!(changed, 1);
    assert!(lines[..3].iter().all(|l| l.content == "See you tomorrow"));
    assert_eq!(lines[3].content, "Something else entirely");
}

#[tokio::test]
async fn test_reconcileLineGroups_withMovedLine_shouldNotGroup() {
    let arbiter = ConsensusArbiter::new(None);
    let mut lines = vec![
        shown("Hello wrold", 0.0, 0.1),
        shown("Hello world", 0.1, 0.2).with_geometry(60, 700, 700, 400),
    ];

    let changed = reconcile_line_groups(&mut lines, &arbiter, &ReadingMatcher::default(), 0.1).await;

    assert_eq!(changed, 0);
    assert_eq!(lines[0].content, "Hello wrold");
}

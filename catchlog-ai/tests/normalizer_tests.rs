//! Integration tests for the response normalizer's tracing output and its
//! behavior on hostile input
//!
//! Unit tests beside the normalizer cover the field rules; these check what
//! an operator sees in the logs and that stored outcomes read back intact.

mod helpers;

use catchlog_ai::models::AnalysisOutcome;
use catchlog_ai::services::{NormalizeError, ResponseNormalizer};
use helpers::log_capture::capture_logs;
use tracing::Level;

#[test]
fn test_parse_failure_logs_error_with_raw_response() {
    let raw = "Sorry, I can't identify that.";

    let (outcome, logs) = capture_logs(|| ResponseNormalizer::new().normalize(raw));

    assert!(outcome.unwrap().is_parse_error());
    logs.assert_contains("Failed to parse vision response");
    let errors = logs.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].fields["raw_response"], raw);
    assert!(errors[0].fields.contains_key("error"));
}

#[test]
fn test_missing_input_logs_warning() {
    let (outcome, logs) = capture_logs(|| ResponseNormalizer::new().normalize(""));

    assert_eq!(outcome, Err(NormalizeError::MissingInput));
    assert_eq!(logs.at_level(Level::WARN).len(), 1);
    logs.assert_contains("no response text provided");
    assert!(logs.at_level(Level::ERROR).is_empty());
}

#[test]
fn test_successful_parse_is_quiet() {
    let (outcome, logs) = capture_logs(|| {
        ResponseNormalizer::new().normalize(r#"{"isFish": false, "reason": "a boat"}"#)
    });

    assert!(matches!(outcome, Ok(AnalysisOutcome::NotFish(_))));
    assert!(logs.at_level(Level::WARN).is_empty());
    assert!(logs.at_level(Level::ERROR).is_empty());
}

#[test]
fn test_hostile_inputs_always_yield_complete_records() {
    let normalizer = ResponseNormalizer::new();
    let inputs = [
        "{",
        "[]",
        "[1, 2, 3]",
        "42",
        "\"just a string\"",
        "true",
        "```",
        "``````",
        "```json\n```",
        "{\"species\": {\"nested\": [1, {\"deep\": null}]}}",
        "{\"characteristics\": \"not a list\", \"regulations\": [\"yes\"]}",
        "{\"isFish\": \"false\", \"confidence\": 0.9}",
        "{\"species\": \"\\u0000\\u202e<svg onload=x>\"}",
        "\u{feff}{\"species\": \"bom\"}",
    ];

    for input in inputs {
        let outcome = normalizer
            .normalize(input)
            .unwrap_or_else(|e| panic!("{:?} for input {:?}", e, input));

        let json = serde_json::to_value(&outcome).unwrap();
        match &outcome {
            AnalysisOutcome::NotFish(_) => {
                assert_eq!(json["isFish"], false, "input {:?}", input);
                assert!(json["reason"].is_string());
            }
            AnalysisOutcome::Fish(_) | AnalysisOutcome::ParseError(_) => {
                for field in ["species", "scientificName", "confidence", "habitat", "size"] {
                    assert!(json[field].is_string(), "{} missing for {:?}", field, input);
                }
                assert!(json["characteristics"].is_array());
                assert!(json["regulations"]["canKeep"].is_string());
                assert!(!json["species"].as_str().unwrap().contains('<'));
            }
        }
    }
}

#[test]
fn test_stored_outcomes_read_back_equal() {
    let normalizer = ResponseNormalizer::new();

    for input in [
        r#"{"isFish": true, "species": "Brook Trout & Char", "characteristics": ["Red spots"]}"#,
        r#"{"isFish": false, "reason": "It's a \"shoe\""}"#,
        "not json at all",
    ] {
        let outcome = normalizer.normalize(input).unwrap();
        let stored = serde_json::to_string(&outcome).unwrap();

        assert_eq!(AnalysisOutcome::from_stored_json(&stored).unwrap(), outcome);
    }
}

#[test]
fn test_byte_order_mark_is_ignored() {
    let outcome = ResponseNormalizer::new()
        .normalize("\u{feff}{\"species\": \"bom\"}\n")
        .unwrap();

    assert!(!outcome.is_parse_error());
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["species"], "bom");
}

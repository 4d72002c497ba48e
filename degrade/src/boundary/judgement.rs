//! Per-variant verdicts from an external comparator.

use serde::{Deserialize, Serialize};

/// Confidence at or above which a prediction counts as confident.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Expected answer that accepts any prediction.
pub const UNKNOWN_ANSWER: &str = "unknown";

/// Outcome of comparing one variant against its expected answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Judgement {
    pub is_correct: bool,
    pub is_confident: bool,
    /// Raw confidence reported by the comparator, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Judgement {
    pub fn new(is_correct: bool, is_confident: bool) -> Self {
        Self {
            is_correct,
            is_confident,
            confidence: None,
        }
    }

    /// Judge a `(prediction, confidence)` pair against the expected answer.
    pub fn from_prediction(
        prediction: &str,
        expected: &str,
        confidence: f64,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            is_correct: prediction_matches(prediction, expected),
            is_confident: confidence >= confidence_threshold,
            confidence: Some(confidence),
        }
    }

    /// A variant is handled successfully only when the answer is both
    /// correct and confident.
    pub fn is_success(&self) -> bool {
        self.is_correct && self.is_confident
    }
}

/// Loose answer matching.
///
/// An expected answer of `"unknown"` accepts anything. When both strings
/// contain a run of digits the first runs must be equal; otherwise the
/// strings are compared ignoring case.
pub fn prediction_matches(prediction: &str, expected: &str) -> bool {
    if expected.eq_ignore_ascii_case(UNKNOWN_ANSWER) {
        return true;
    }
    match (first_digit_run(prediction), first_digit_run(expected)) {
        (Some(p), Some(e)) => p == e,
        _ => prediction.to_lowercase() == expected.to_lowercase(),
    }
}

fn first_digit_run(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..len])
}

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Confidence used when neither the structured reply nor the prose carries one.
pub const DEFAULT_CONFIDENCE: f64 = 0.75;

/// Raw structured confidence assumed when the JSON object has no usable value.
/// It goes through the same scaling as a reported value.
const DEFAULT_STRUCTURED_CONFIDENCE: f64 = 75.0;

/// Prose confidence patterns, highest priority first.
static TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"confidence[:\s]+(\d+)%",
        r"(\d+)%\s*confiden",
        r"score[:\s]+(\d+)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid confidence regex pattern"))
    .collect()
});

/// Scale a reported confidence onto 0..=1.
///
/// Values whose magnitude exceeds 1 are read as percentages and divided by
/// 100. Nothing is clamped afterwards: a reported 150 becomes 1.5.
pub fn normalize_confidence(value: f64) -> f64 {
    if value.abs() > 1.0 {
        value / 100.0
    } else {
        value
    }
}

/// Read `confidence_score` out of a decoded reply object.
///
/// Numbers are used directly. Numeric strings (optionally ending in `%`) are
/// accepted too; any other shape counts as absent.
pub fn structured_confidence(object: &serde_json::Map<String, Value>) -> f64 {
    let raw = object
        .get("confidence_score")
        .and_then(numeric_value)
        .unwrap_or(DEFAULT_STRUCTURED_CONFIDENCE);
    normalize_confidence(raw)
}

/// Infer a confidence from free text.
///
/// Patterns are tried in priority order against the lower-cased reply; the
/// first match wins and its integer is divided by 100.
pub fn confidence_from_text(text: &str) -> f64 {
    let lowered = text.to_lowercase();

    TEXT_PATTERNS
        .iter()
        .find_map(|pattern| {
            pattern
                .captures(&lowered)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
        })
        .map(|value| value / 100.0)
        .unwrap_or(DEFAULT_CONFIDENCE)
}

pub(crate) fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

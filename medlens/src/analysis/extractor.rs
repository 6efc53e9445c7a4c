//! Turns a model reply into a [`DiagnosisRecord`] or a [`ChatReply`].
//!
//! Two paths exist. The structured path decodes the span from the first `{`
//! to the last `}` as a JSON object and reads each expected field with a
//! default. When that span is missing or does not decode, the fallback path
//! sorts the reply's lines into English and Arabic buckets. Neither path can
//! fail: malformed output always yields a usable record.

use serde_json::{Map, Value};

use crate::models::{ChatReply, DiagnosisRecord};

use super::confidence::{confidence_from_text, numeric_value, structured_confidence};

pub const DEFAULT_IMAGE_TYPE: &str = "Medical Image";
pub const DEFAULT_DIAGNOSIS_ENGLISH: &str = "Analysis completed";
pub const DEFAULT_DIAGNOSIS_ARABIC: &str = "يرجى استشارة أخصائي طبي";
pub const DEFAULT_FINDING: &str = "Image analyzed";
pub const DEFAULT_RECOMMENDATIONS: &str = "Consult a healthcare professional";

pub const FALLBACK_DIAGNOSIS_ARABIC: &str = "يرجى استشارة أخصائي طبي للحصول على تشخيص دقيق";
pub const FALLBACK_FINDING: &str = "Analysis completed";
pub const FALLBACK_RECOMMENDATIONS: &str =
    "Please consult with a qualified healthcare professional for proper diagnosis and treatment.";

/// Fallback English text is cut to this many characters when no English line survives.
const FALLBACK_ENGLISH_CHARS: usize = 500;

/// Lower-case markers that copy an English line into the findings list.
const FINDING_KEYWORDS: &[&str] = &["finding", "observed", "shows", "indicates"];

pub const CHAT_DEFAULT_ARABIC: &str = "عذراً، لم أتمكن من تقديم إجابة باللغة العربية. يرجى استشارة أخصائي طبي.";
pub const CHAT_EMPTY_ENGLISH: &str =
    "I could not generate a response. Please rephrase your question or consult a healthcare professional.";
pub const CHAT_DEFAULT_CONFIDENCE: f64 = 75.0;

/// Locate the first `{` and the last `}` and decode what lies between them.
///
/// This is not a balanced-brace scan. Prose containing braces around the
/// object, or two separate objects, makes the decode fail; no repair is
/// attempted.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "Reply JSON span did not decode");
            None
        }
    }
}

/// Parse a diagnosis reply. Never fails.
pub fn extract_diagnosis(reply: &str) -> DiagnosisRecord {
    match extract_json_object(reply) {
        Some(object) => {
            tracing::debug!(path = "structured", "Extracted diagnosis");
            diagnosis_from_object(&object)
        }
        None => {
            tracing::debug!(path = "fallback", "Extracted diagnosis");
            diagnosis_from_text(reply)
        }
    }
}

fn diagnosis_from_object(object: &Map<String, Value>) -> DiagnosisRecord {
    let findings = match object.get("findings") {
        Some(Value::Array(items)) => items.iter().filter_map(string_value).collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.clone()],
        _ => Vec::new(),
    };

    // An explicit null means the model chose to give no recommendation.
    let recommendations = match object.get("recommendations") {
        None => Some(DEFAULT_RECOMMENDATIONS.to_string()),
        Some(Value::Null) => None,
        Some(value) => string_value(value).or_else(|| Some(DEFAULT_RECOMMENDATIONS.to_string())),
    };

    DiagnosisRecord {
        image_type: string_field(object, "image_type", DEFAULT_IMAGE_TYPE),
        diagnosis_english: string_field(object, "diagnosis_english", DEFAULT_DIAGNOSIS_ENGLISH),
        diagnosis_arabic: string_field(object, "diagnosis_arabic", DEFAULT_DIAGNOSIS_ARABIC),
        confidence_score: structured_confidence(object),
        findings: non_empty_or(findings, DEFAULT_FINDING),
        recommendations,
    }
}

/// Line buckets produced by the fallback path.
#[derive(Debug, Default, PartialEq)]
struct LineBuckets {
    english: Vec<String>,
    arabic: Vec<String>,
    findings: Vec<String>,
}

fn bucket_lines(reply: &str) -> LineBuckets {
    let mut buckets = LineBuckets::default();
    let mut arabic_started = false;

    for line in reply.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
        // Once Arabic text appears every later line belongs to it, whatever its script.
        if arabic_started || contains_arabic(line) {
            arabic_started = true;
            buckets.arabic.push(line.to_string());
            continue;
        }

        if line.starts_with('{') {
            continue;
        }

        let lowered = line.to_lowercase();
        if FINDING_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            buckets.findings.push(line.to_string());
        }
        buckets.english.push(line.to_string());
    }

    buckets
}

fn diagnosis_from_text(reply: &str) -> DiagnosisRecord {
    let buckets = bucket_lines(reply);

    let diagnosis_english = if buckets.english.is_empty() {
        let head: String = reply.chars().take(FALLBACK_ENGLISH_CHARS).collect();
        if head.trim().is_empty() {
            DEFAULT_DIAGNOSIS_ENGLISH.to_string()
        } else {
            head
        }
    } else {
        buckets.english.join(" ")
    };

    let diagnosis_arabic = if buckets.arabic.is_empty() {
        FALLBACK_DIAGNOSIS_ARABIC.to_string()
    } else {
        buckets.arabic.join(" ")
    };

    DiagnosisRecord {
        image_type: DEFAULT_IMAGE_TYPE.to_string(),
        diagnosis_english,
        diagnosis_arabic,
        confidence_score: confidence_from_text(reply),
        findings: non_empty_or(buckets.findings, FALLBACK_FINDING),
        recommendations: Some(FALLBACK_RECOMMENDATIONS.to_string()),
    }
}

/// Parse a chat reply. Never fails.
///
/// The confidence stays on the 0..=100 scale the chat prompt asks for.
pub fn extract_chat_reply(reply: &str) -> ChatReply {
    let trimmed = reply.trim();
    let english_default = if trimmed.is_empty() {
        CHAT_EMPTY_ENGLISH
    } else {
        trimmed
    };

    let Some(object) = extract_json_object(reply) else {
        return ChatReply {
            response_english: english_default.to_string(),
            response_arabic: CHAT_DEFAULT_ARABIC.to_string(),
            is_medical: true,
            confidence_score: CHAT_DEFAULT_CONFIDENCE,
        };
    };

    ChatReply {
        response_english: string_field(&object, "response_english", english_default),
        response_arabic: string_field(&object, "response_arabic", CHAT_DEFAULT_ARABIC),
        is_medical: object
            .get("is_medical")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        confidence_score: object
            .get("confidence_score")
            .and_then(numeric_value)
            .unwrap_or(CHAT_DEFAULT_CONFIDENCE),
    }
}

pub fn contains_arabic(text: &str) -> bool {
    text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_field(object: &Map<String, Value>, key: &str, default: &str) -> String {
    object
        .get(key)
        .and_then(string_value)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn non_empty_or(items: Vec<String>, placeholder: &str) -> Vec<String> {
    if items.is_empty() {
        vec![placeholder.to_string()]
    } else {
        items
    }
}

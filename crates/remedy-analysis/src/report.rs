//! Defensive extraction of analysis output
//!
//! The suggestion generator may answer with a JSON object (possibly
//! wrapped in prose or a code fence) or with free text. Fields that are
//! missing or malformed fall back to documented defaults instead of
//! failing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root cause, severity hint and suggestions extracted from analysis text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Root-cause text; the whole response when no field is found
    pub root_cause: String,
    /// Severity score in `[0, 1]`
    pub severity: f64,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Candidate remediation actions
    pub suggested_actions: Vec<String>,
    /// The raw response
    pub raw: String,
}

impl AnalysisReport {
    /// Severity used when the response carries none
    pub const DEFAULT_SEVERITY: f64 = 0.0;

    /// Confidence used when the response carries none
    pub const DEFAULT_CONFIDENCE: f64 = 0.5;

    /// Parse generator output
    ///
    /// Never fails. Out-of-range numbers are clamped to `[0, 1]`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match extract_json_object(trimmed) {
            Some(obj) => Self::from_json(&obj, trimmed),
            None => Self::from_text(trimmed),
        }
    }

    fn from_json(obj: &Map<String, Value>, raw: &str) -> Self {
        let root_cause = ["root_cause", "rootCause", "cause"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| raw.to_string(), str::to_string);

        let severity = ["severity", "severity_score", "severityScore"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(as_score))
            .unwrap_or(Self::DEFAULT_SEVERITY);

        let confidence = obj
            .get("confidence")
            .and_then(as_score)
            .unwrap_or(Self::DEFAULT_CONFIDENCE);

        let suggested_actions = ["suggested_actions", "suggestedActions", "actions"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_array))
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            root_cause,
            severity,
            confidence,
            suggested_actions,
            raw: raw.to_string(),
        }
    }

    fn from_text(raw: &str) -> Self {
        let mut root_cause = None;
        let mut severity = None;
        let mut confidence = None;
        let mut suggested_actions = Vec::new();

        for line in raw.lines().map(str::trim) {
            if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
                suggested_actions.push(item.trim().to_string());
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match normalize_key(key).as_str() {
                "rootcause" | "cause" if !value.is_empty() => root_cause = Some(value.to_string()),
                "severity" => severity = parse_score(value),
                "confidence" => confidence = parse_score(value),
                _ => {}
            }
        }

        Self {
            root_cause: root_cause.unwrap_or_else(|| raw.to_string()),
            severity: severity.unwrap_or(Self::DEFAULT_SEVERITY),
            confidence: confidence.unwrap_or(Self::DEFAULT_CONFIDENCE),
            suggested_actions,
            raw: raw.to_string(),
        }
    }
}

/// Find a JSON object in `text`, tolerating surrounding prose or fences
fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(obj)) = serde_json::from_str(text) {
        return Some(obj);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn as_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().map(clamp_unit),
        Value::String(s) => parse_score(s),
        _ => None,
    }
}

fn parse_score(s: &str) -> Option<f64> {
    let s = s.trim().trim_end_matches('%');
    let v: f64 = s.split_whitespace().next()?.parse().ok()?;
    if !v.is_finite() {
        return None;
    }
    // "85%" and "85" both mean 0.85
    let v = if v > 1.0 && v <= 100.0 { v / 100.0 } else { v };
    Some(clamp_unit(v))
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

use serde_json::Value;

use super::{ScoringConfig, SuitabilityAssessment};

pub(crate) const SCORE_MIN: f32 = 0.0;
pub(crate) const SCORE_MAX: f32 = 100.0;

/// Turn a raw completion into an assessment. Never fails: unusable responses come back with
/// `confidence == false` and the configured default score.
pub(crate) fn parse_assessment(raw: &str, config: &ScoringConfig) -> SuitabilityAssessment {
    let Some(payload) = extract_json(raw) else {
        return unusable(config, "response was not a JSON object");
    };

    let Some(score) = payload.get("score").and_then(numeric) else {
        return unusable(config, "response did not include a numeric score");
    };

    let rationale = ["analysis", "rationale", "summary"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or("no rationale provided")
        .to_string();

    let red_flags: Vec<String> = payload
        .get("red_flags")
        .and_then(Value::as_array)
        .map(|flags| {
            flags
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|flag| !flag.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let model_confidence = payload
        .get("confidence")
        .and_then(numeric)
        .map(|value| value.clamp(0.0, 100.0).round() as u8);

    let mut assessment = SuitabilityAssessment {
        score: score.clamp(SCORE_MIN, SCORE_MAX),
        rationale,
        confidence: true,
        red_flags,
        model_confidence,
    };

    if let (Some(floor), Some(reported)) = (config.min_model_confidence, model_confidence) {
        if reported < floor {
            assessment.confidence = false;
            assessment.rationale = format!(
                "{} (model confidence {reported} below required {floor})",
                assessment.rationale
            );
        }
    }

    assessment
}

fn unusable(config: &ScoringConfig, detail: &str) -> SuitabilityAssessment {
    SuitabilityAssessment {
        score: config.default_score,
        rationale: format!("AI assessment could not be parsed: {detail}"),
        confidence: false,
        red_flags: Vec::new(),
        model_confidence: None,
    }
}

fn numeric(value: &Value) -> Option<f32> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text
            .trim()
            .trim_end_matches("/100")
            .trim()
            .parse::<f64>()
            .ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed as f32)
}

/// Locate the JSON object in a completion, tolerating Markdown fences and surrounding prose.
fn extract_json(raw: &str) -> Option<Value> {
    let cleaned = strip_fences(raw.trim());
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(cleaned) {
        return Some(value);
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&cleaned[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn strip_fences(text: &str) -> &str {
    let mut cleaned = text;
    if cleaned.starts_with("```") {
        cleaned = cleaned.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    }
    if let Some(stripped) = cleaned.trim_end().strip_suffix("```") {
        cleaned = stripped;
    }
    cleaned.trim()
}

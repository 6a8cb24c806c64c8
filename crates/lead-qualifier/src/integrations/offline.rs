//! Adapters that never leave the process: a keyword rubric standing in for the completion
//! backend, plus log-only case management and notifications.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;

use crate::workflows::intake::{
    CaseError, CaseManagement, CompletionClient, CompletionError, LeadRecord, Notification,
    NotificationError, Notifier,
};

const LEAD_SECTION_START: &str = "LEAD INFORMATION:";
const LEAD_SECTION_END: &str = "Respond with";

const ER_KEYWORDS: &[&str] = &[
    "emergency room",
    "er visit",
    "emergency department",
    "ed visit",
    "hospital",
    "ambulance",
];
const FOLLOW_UP_KEYWORDS: &[&str] = &[
    "orthopedic",
    "orthopaedic",
    "physical therapy",
    "pt",
    "chiropractor",
    "follow-up",
    "followup",
    "specialist",
    "mri",
];
const SURGERY_KEYWORDS: &[&str] = &["surgery", "surgical", "operation"];
const SERIOUS_INJURY_KEYWORDS: &[&str] = &[
    "fracture",
    "broken",
    "permanent",
    "disability",
    "amputation",
    "traumatic brain",
    "tbi",
    "spinal cord",
    "paralysis",
    "herniated",
    "torn",
    "rupture",
    "internal bleeding",
];
const CLEAR_LIABILITY_KEYWORDS: &[&str] = &[
    "rear-end",
    "rear ended",
    "rear-ended",
    "ran red light",
    "ran a red light",
    "ran stop sign",
    "speeding",
    "dui",
    "dwi",
    "drunk",
    "intoxicated",
    "citation issued",
    "ticket issued",
    "was cited",
    "admitted fault",
];
const DISPUTED_LIABILITY_KEYWORDS: &[&str] = &[
    "disputed",
    "may be at fault",
    "comparative",
    "contributory",
    "both parties",
    "shared fault",
    "partial fault",
];
const INSUFFICIENT_TREATMENT_KEYWORDS: &[&str] = &[
    "no treatment",
    "none yet",
    "hasn't seen doctor",
    "refused treatment",
    "self-treating",
    "home remedies only",
];

/// Deterministic keyword rubric answering in the same JSON shape as the hosted model.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordCompletionClient;

impl KeywordCompletionClient {
    fn assess(&self, lead_text: &str) -> (f32, Vec<String>, Vec<String>) {
        let text = normalize(lead_text);
        let mut score = 30.0_f32;
        let mut findings = Vec::new();
        let mut red_flags = Vec::new();

        let has_er = mentions_any(&text, ER_KEYWORDS);
        let has_follow_up = mentions_any(&text, FOLLOW_UP_KEYWORDS);
        let has_surgery = mentions_any(&text, SURGERY_KEYWORDS);
        if has_surgery || (has_er && has_follow_up) {
            score += 20.0;
            findings.push("documented medical treatment".to_string());
        }

        if has_surgery || mentions_any(&text, SERIOUS_INJURY_KEYWORDS) {
            score += 15.0;
            findings.push("serious injury indicators".to_string());
        }

        if mentions_any(&text, CLEAR_LIABILITY_KEYWORDS) {
            score += 20.0;
            findings.push("clear liability indicators".to_string());
        }

        if text.contains(&normalize("preferred service area")) {
            score += 10.0;
            findings.push("preferred county".to_string());
        }

        if let Some(keyword) = first_mention(&text, DISPUTED_LIABILITY_KEYWORDS) {
            score -= 15.0;
            red_flags.push(format!("liability may be disputed ('{keyword}')"));
        }

        if let Some(keyword) = first_mention(&text, INSUFFICIENT_TREATMENT_KEYWORDS) {
            score -= 15.0;
            red_flags.push(format!("medical treatment may be insufficient ('{keyword}')"));
        }

        (score.clamp(0.0, 100.0), findings, red_flags)
    }
}

impl CompletionClient for KeywordCompletionClient {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let (score, findings, red_flags) = self.assess(lead_section(prompt));
        let analysis = if findings.is_empty() {
            "Keyword rubric found no strong case indicators.".to_string()
        } else {
            format!("Keyword rubric found {}.", findings.join(", "))
        };

        Ok(json!({
            "score": score,
            "analysis": analysis,
            "red_flags": red_flags,
            "confidence": 50,
        })
        .to_string())
    }
}

/// Case manager that assigns sequential local ids and logs instead of calling a practice system.
#[derive(Debug, Default)]
pub struct LogCaseManager {
    sequence: AtomicU64,
}

impl CaseManagement for LogCaseManager {
    fn create_case(&self, record: &LeadRecord) -> Result<String, CaseError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let case_id = format!("local-{id:05}");
        tracing::info!(lead_id = %record.id, case_id = %case_id, "case recorded (log only)");
        Ok(case_id)
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        tracing::info!(
            lead_id = %notification.lead_id,
            recipient = %notification.recipient,
            subject = notification.template.subject(),
            "notification (log only)"
        );
        Ok(())
    }
}

fn lead_section(prompt: &str) -> &str {
    let start = prompt
        .find(LEAD_SECTION_START)
        .map(|index| index + LEAD_SECTION_START.len())
        .unwrap_or(0);
    let rest = &prompt[start..];
    match rest.find(LEAD_SECTION_END) {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// Lowercase, replace punctuation with spaces, and pad so phrases match on word boundaries.
fn normalize(text: &str) -> String {
    let words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect();
    format!(" {} ", words.join(" "))
}

fn first_mention<'a>(text: &str, keywords: &[&'a str]) -> Option<&'a str> {
    keywords
        .iter()
        .copied()
        .find(|keyword| text.contains(&normalize(keyword)))
}

fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    first_mention(text, keywords).is_some()
}

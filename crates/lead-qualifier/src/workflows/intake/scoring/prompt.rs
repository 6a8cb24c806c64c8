use std::fmt::Write as _;

use chrono::NaiveDate;

use super::super::domain::LeadRecord;
use super::super::eligibility::EligibilityOutcome;
use super::super::jurisdiction::JurisdictionProfile;

const TRUNCATION_MARKER: &str = " [truncated]";

pub(crate) fn build_prompt(
    record: &LeadRecord,
    profile: &JurisdictionProfile,
    eligibility: &EligibilityOutcome,
    today: NaiveDate,
    max_description_chars: usize,
) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are an intake specialist for a personal injury law firm practicing in {}.",
        profile.name
    );
    let _ = writeln!(
        prompt,
        "Assess how suitable the following lead is for representation and score it from 0 to 100."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Weigh incident type, injury severity, medical treatment,");
    let _ = writeln!(prompt, "liability clarity, insurance coverage, and time remaining on the");
    let _ = writeln!(
        prompt,
        "{} statute of limitations. Be conservative: reserve scores above 75 for",
        profile.sol_duration
    );
    let _ = writeln!(prompt, "cases with clear merit.");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "LEAD INFORMATION:");
    let _ = writeln!(prompt, "Case type: {}", or_unknown(&record.case_type));
    match record.injury_date {
        Some(date) => {
            let days = (today - date).num_days();
            let _ = writeln!(prompt, "Injury date: {date} ({days} days ago)");
        }
        None => {
            let _ = writeln!(prompt, "Injury date: not provided");
        }
    }
    let _ = writeln!(
        prompt,
        "County: {}{}",
        eligibility.county.as_deref().unwrap_or("not provided"),
        if eligibility.preferred_county {
            " (preferred service area)"
        } else {
            ""
        }
    );
    if let Some(location) = record.accident_location.as_deref() {
        let _ = writeln!(prompt, "Accident location: {}", or_unknown(location));
    }
    let _ = writeln!(prompt, "Jurisdiction: {} ({})", profile.name, profile.code);
    let _ = writeln!(prompt, "Description:");
    let _ = writeln!(
        prompt,
        "{}",
        truncate_chars(or_unknown(&record.description), max_description_chars)
    );
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Respond with a single JSON object and nothing else:"
    );
    let _ = writeln!(
        prompt,
        "{{\"score\": <0-100>, \"analysis\": \"<2-3 sentence assessment>\", \"red_flags\": [\"<concern>\"], \"confidence\": <0-100>}}"
    );

    prompt
}

fn or_unknown(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "not provided"
    } else {
        trimmed
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

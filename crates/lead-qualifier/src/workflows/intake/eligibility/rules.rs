use chrono::{Months, NaiveDate};

use super::super::domain::LeadRecord;
use super::super::jurisdiction::{normalize_county, JurisdictionProfile};
use super::config::EligibilityConfig;
use super::{EligibilityRule, RuleCheck};

pub(crate) fn time_bar(
    record: &LeadRecord,
    profile: &JurisdictionProfile,
    config: &EligibilityConfig,
    today: NaiveDate,
) -> RuleCheck {
    let Some(injury_date) = record.injury_date else {
        return RuleCheck::fail(
            EligibilityRule::TimeBar,
            "time-bar: injury date missing, statute of limitations cannot be verified",
        );
    };

    let Some(expires_on) = profile.sol_duration.expires_on(injury_date) else {
        return RuleCheck::pass(
            EligibilityRule::TimeBar,
            format!("injury on {injury_date} is within the limitation window"),
        );
    };

    if today > expires_on {
        return RuleCheck::fail(
            EligibilityRule::TimeBar,
            format!(
                "time-bar: injury on {injury_date} is outside the {} {} statute of limitations (expired {expires_on})",
                profile.sol_duration, profile.code
            ),
        );
    }

    if config.min_sol_months_remaining > 0 {
        let cutoff = expires_on.checked_sub_months(Months::new(config.min_sol_months_remaining));
        if cutoff.map(|cutoff| today > cutoff).unwrap_or(true) {
            return RuleCheck::fail(
                EligibilityRule::TimeBar,
                format!(
                    "time-bar: statute of limitations expires {expires_on}, inside the {}-month intake buffer",
                    config.min_sol_months_remaining
                ),
            );
        }
    }

    RuleCheck::pass(
        EligibilityRule::TimeBar,
        format!("statute of limitations runs until {expires_on}"),
    )
}

pub(crate) struct GeographyCheck {
    pub check: RuleCheck,
    pub county: Option<String>,
    pub preferred: bool,
}

pub(crate) fn geography(
    record: &LeadRecord,
    profile: &JurisdictionProfile,
    config: &EligibilityConfig,
) -> GeographyCheck {
    let Some(raw_county) = resolve_county(record, profile) else {
        return GeographyCheck {
            check: RuleCheck::fail(
                EligibilityRule::Geography,
                "geography: county could not be determined from the intake record",
            ),
            county: None,
            preferred: false,
        };
    };

    let preferred_names = if config.preferred_counties.is_empty() {
        &profile.default_preferred_counties
    } else {
        &config.preferred_counties
    };
    let preferred_set = profile.expand_counties(preferred_names);
    let preferred = preferred_set.contains(&normalize_county(&raw_county));

    let canonical = profile.canonical_county(&raw_county).map(str::to_string);
    let county = canonical.clone().unwrap_or(raw_county);

    let check = match (canonical.is_some(), preferred) {
        (true, true) => RuleCheck::pass(
            EligibilityRule::Geography,
            format!("{county} County is a preferred county"),
        ),
        (true, false) => RuleCheck::pass(
            EligibilityRule::Geography,
            format!("{county} County is within {}", profile.name),
        ),
        (false, true) => RuleCheck::pass(
            EligibilityRule::Geography,
            format!("{county} County accepted by preferred-county override"),
        ),
        (false, false) => RuleCheck::fail(
            EligibilityRule::Geography,
            format!("geography: {county} County is not within {}", profile.name),
        ),
    };

    GeographyCheck {
        check,
        county: Some(county),
        preferred,
    }
}

pub(crate) fn case_type(record: &LeadRecord, config: &EligibilityConfig) -> RuleCheck {
    let label = record.case_type.trim();
    let excluded = config
        .excluded_case_types
        .iter()
        .any(|excluded| excluded.trim().eq_ignore_ascii_case(label));

    if excluded {
        RuleCheck::fail(
            EligibilityRule::CaseType,
            format!("case type: '{label}' is not handled by the practice"),
        )
    } else {
        RuleCheck::pass(
            EligibilityRule::CaseType,
            format!("case type '{label}' accepted"),
        )
    }
}

/// County named on the record, or one recovered from the accident location. Location
/// matching prefers an explicit "<name> County" phrase over a bare county name.
pub(crate) fn resolve_county(record: &LeadRecord, profile: &JurisdictionProfile) -> Option<String> {
    if let Some(county) = record
        .county
        .as_deref()
        .map(str::trim)
        .filter(|county| !county.is_empty())
    {
        return Some(county.to_string());
    }

    let location = record.accident_location.as_deref()?;
    let haystack = format!(" {} ", tokenize(location));

    let mut counties: Vec<&String> = profile.counties.iter().collect();
    counties.sort_by_key(|county| std::cmp::Reverse(county.len()));

    counties
        .iter()
        .find(|county| haystack.contains(&format!(" {} county ", tokenize(county))))
        .or_else(|| {
            counties
                .iter()
                .find(|county| haystack.contains(&format!(" {} ", tokenize(county))))
        })
        .map(|county| county.to_string())
}

fn tokenize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

use super::common::*;
use crate::workflows::intake::{
    EligibilityConfig, EligibilityEvaluator, EligibilityRule, JurisdictionCatalog,
    JurisdictionProfile,
};
use std::sync::Arc;

fn profile(code: &str) -> Arc<JurisdictionProfile> {
    JurisdictionCatalog::bundled()
        .profile_for(code)
        .expect("bundled jurisdiction")
}

#[test]
fn injury_outside_limitation_window_is_time_barred() {
    let mut record = lead("sol-expired");
    record.injury_date = Some(date(2021, 6, 1));

    let outcome = EligibilityEvaluator::default().evaluate(&record, &profile("SC"), today());

    assert!(outcome.disqualified);
    assert!(!outcome.passed(EligibilityRule::TimeBar));
    let reason = outcome.reason.expect("reason recorded");
    assert!(reason.starts_with("time-bar"), "unexpected reason: {reason}");
    assert!(reason.contains("2024-06-01"));
}

#[test]
fn last_day_of_limitation_window_is_still_timely() {
    let mut record = lead("sol-last-day");
    record.injury_date = Some(date(2022, 6, 1));

    let outcome = EligibilityEvaluator::default().evaluate(&record, &profile("SC"), today());

    assert!(outcome.passed(EligibilityRule::TimeBar));
    assert!(!outcome.disqualified);
}

#[test]
fn missing_injury_date_fails_time_bar() {
    let mut record = lead("no-date");
    record.injury_date = None;

    let outcome = EligibilityEvaluator::default().evaluate(&record, &profile("SC"), today());

    assert!(outcome.disqualified);
    assert!(outcome
        .reason
        .as_deref()
        .is_some_and(|reason| reason.contains("injury date missing")));
}

#[test]
fn intake_buffer_disqualifies_leads_close_to_expiry() {
    let mut record = lead("buffer");
    record.injury_date = Some(date(2022, 7, 15));
    let evaluator = EligibilityEvaluator::new(EligibilityConfig {
        min_sol_months_remaining: 3,
        ..EligibilityConfig::default()
    });

    let outcome = evaluator.evaluate(&record, &profile("SC"), today());

    assert!(outcome.disqualified);
    assert!(outcome
        .reason
        .as_deref()
        .is_some_and(|reason| reason.contains("3-month intake buffer")));
}

#[test]
fn county_is_recovered_from_accident_location() {
    let mut record = lead("wa-location");
    record.jurisdiction = "WA".to_string();
    record.county = None;
    record.accident_location = Some("Pike St & 3rd Ave, Seattle, King County".to_string());

    let outcome = EligibilityEvaluator::default().evaluate(&record, &profile("WA"), today());

    assert_eq!(outcome.county.as_deref(), Some("King"));
    assert!(outcome.preferred_county);
    assert!(!outcome.disqualified);
}

#[test]
fn county_outside_jurisdiction_fails_geography() {
    let mut record = lead("out-of-state");
    record.county = Some("King County".to_string());

    let outcome = EligibilityEvaluator::default().evaluate(&record, &profile("SC"), today());

    assert!(!outcome.passed(EligibilityRule::Geography));
    assert!(outcome
        .reason
        .as_deref()
        .is_some_and(|reason| reason.starts_with("geography")));
}

#[test]
fn unresolvable_county_fails_geography() {
    let mut record = lead("nowhere");
    record.county = None;
    record.accident_location = Some("parking lot behind the mall".to_string());

    let outcome = EligibilityEvaluator::default().evaluate(&record, &profile("SC"), today());

    assert!(outcome.disqualified);
    assert!(outcome.county.is_none());
}

#[test]
fn metro_group_override_replaces_default_preferred_counties() {
    let mut record = lead("midlands");
    record.county = Some("richland county".to_string());
    let evaluator = EligibilityEvaluator::new(EligibilityConfig {
        preferred_counties: vec!["Columbia Midlands".to_string()],
        ..EligibilityConfig::default()
    });

    let outcome = evaluator.evaluate(&record, &profile("SC"), today());
    assert_eq!(outcome.county.as_deref(), Some("Richland"));
    assert!(outcome.preferred_county);

    let charleston = evaluator.evaluate(&lead("charleston"), &profile("SC"), today());
    assert!(!charleston.preferred_county);
    assert!(!charleston.disqualified);
}

#[test]
fn excluded_case_types_match_case_insensitively() {
    let mut record = lead("malpractice");
    record.case_type = "medical malpractice".to_string();
    let evaluator = EligibilityEvaluator::new(EligibilityConfig {
        excluded_case_types: vec!["Medical Malpractice".to_string()],
        ..EligibilityConfig::default()
    });

    let outcome = evaluator.evaluate(&record, &profile("SC"), today());

    assert!(!outcome.passed(EligibilityRule::CaseType));
    assert!(outcome.disqualified);
}

#[test]
fn first_failing_rule_supplies_reason_but_every_rule_is_recorded() {
    let mut record = lead("double-fail");
    record.injury_date = Some(date(2020, 1, 1));
    record.county = Some("Multnomah".to_string());

    let outcome = EligibilityEvaluator::default().evaluate(&record, &profile("SC"), today());

    assert_eq!(outcome.checks.len(), 3);
    assert!(!outcome.passed(EligibilityRule::Geography));
    assert!(outcome.passed(EligibilityRule::CaseType));
    assert!(outcome
        .reason
        .as_deref()
        .is_some_and(|reason| reason.starts_with("time-bar")));
}

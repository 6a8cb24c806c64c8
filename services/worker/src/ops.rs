use crate::infra::{build_processor, jurisdiction_catalog};
use lead_qualifier::config::AppConfig;
use lead_qualifier::error::AppError;
use lead_qualifier::telemetry;
use lead_qualifier::workflows::intake::{
    CycleReport, JurisdictionProfile, LeadId, ProcessingHistory, RecordOutcome, ShutdownSignal,
    Tier,
};
use std::sync::Arc;

pub(crate) fn run_single_cycle(shutdown: Arc<ShutdownSignal>) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let catalog = Arc::new(jurisdiction_catalog(&config.pipeline));
    let processor = build_processor(&config, catalog, Arc::new(ProcessingHistory::default()))?;
    let report = processor.process_pending(&shutdown)?;

    println!(
        "Processed {} lead(s) in {} mode",
        report.fetched(),
        config.pipeline.mode.label()
    );
    for line in report_lines(&report) {
        println!("  {line}");
    }
    Ok(())
}

pub(crate) fn requeue_lead(id: String) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let catalog = Arc::new(jurisdiction_catalog(&config.pipeline));
    let processor = build_processor(&config, catalog, Arc::new(ProcessingHistory::default()))?;
    let record = processor.requeue(&LeadId(id))?;

    println!("Lead {} reset to {}", record.id, record.status.label());
    Ok(())
}

pub(crate) fn show_jurisdiction(code: &str) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let catalog = jurisdiction_catalog(&config.pipeline);
    let profile = catalog.profile_for(code)?;

    for line in profile_lines(&profile) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn report_lines(report: &CycleReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .outcomes
        .iter()
        .map(|(id, outcome)| match outcome {
            RecordOutcome::Completed(result) => {
                let score = result
                    .score
                    .map(|score| format!("{score:.0}"))
                    .unwrap_or_else(|| "-".to_string());
                let case = result
                    .case_id
                    .as_deref()
                    .map(|case_id| format!(" [case {case_id}]"))
                    .unwrap_or_default();
                format!(
                    "{id}: {} score={score}{case} ({})",
                    result.tier.label(),
                    result.reason
                )
            }
            RecordOutcome::Failed(message) => format!("{id}: FAILED ({message})"),
            RecordOutcome::Skipped(message) => format!("{id}: skipped ({message})"),
            RecordOutcome::Deferred => format!("{id}: deferred to next run"),
        })
        .collect();

    if report.interrupted {
        lines.push("cycle interrupted by shutdown".to_string());
    }
    lines.push(format!(
        "totals: {} accepted, {} review, {} declined, {} failed",
        report.tier_count(Tier::AutoAccept),
        report.tier_count(Tier::Review),
        report.tier_count(Tier::Decline),
        report.failed()
    ));
    lines
}

pub(crate) fn profile_lines(profile: &JurisdictionProfile) -> Vec<String> {
    let mut lines = vec![
        format!("{} ({})", profile.name, profile.code),
        format!("Statute of limitations: {}", profile.sol_duration),
    ];
    if !profile.sol_notes.is_empty() {
        lines.push(format!("Notes: {}", profile.sol_notes));
    }
    lines.push(format!("Counties: {}", profile.counties.len()));
    for (metro, counties) in &profile.metro_groups {
        lines.push(format!("  {metro}: {}", counties.join(", ")));
    }
    if !profile.default_preferred_counties.is_empty() {
        lines.push(format!(
            "Preferred by default: {}",
            profile.default_preferred_counties.join(", ")
        ));
    }
    lines
}

use crate::infra::InMemoryLeadStore;
use crate::ops::report_lines;
use chrono::{NaiveDate, Utc};
use clap::Args;
use lead_qualifier::error::AppError;
use lead_qualifier::integrations::{KeywordCompletionClient, LogCaseManager, LogNotifier};
use lead_qualifier::workflows::import::IntakeCsvImporter;
use lead_qualifier::workflows::intake::{
    CycleReport, FixedClock, HistoryStats, JurisdictionCatalog, LeadProcessor, LeadRecord,
    OperationMode, ProcessingHistory, ProcessorConfig, ProcessorParts, ShutdownSignal,
};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

const SAMPLE_EXPORT: &str = include_str!("../data/sample_leads.csv");

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Intake CSV export to qualify. Defaults to a bundled sample.
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Apply PRO-mode side effects through the logging adapters.
    #[arg(long)]
    pub(crate) pro: bool,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Jurisdiction assumed for rows that leave it blank.
    #[arg(long, default_value = "SC")]
    pub(crate) default_jurisdiction: String,
}

pub(crate) struct DemoRun {
    pub(crate) today: NaiveDate,
    pub(crate) mode: OperationMode,
    pub(crate) report: CycleReport,
    pub(crate) records: Vec<LeadRecord>,
    pub(crate) stats: HistoryStats,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let run = qualify_export(args)?;

    println!(
        "Lead qualification demo ({} mode, evaluated {})",
        run.mode.label(),
        run.today
    );
    for line in report_lines(&run.report) {
        println!("  {line}");
    }

    println!("\nRecord store after the run");
    for record in &run.records {
        let note = record.last_error.as_deref().unwrap_or("");
        println!(
            "  {:<12} {:<22} {:<12} {}",
            record.id.as_str(),
            record.name,
            record.status.label(),
            note
        );
    }

    let average = run
        .stats
        .average_score
        .map(|score| format!("{score:.1}"))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "\nProcessed {} | accepted {} | review {} | declined {} | failed {} | average score {}",
        run.stats.processed,
        run.stats.auto_accepted,
        run.stats.review,
        run.stats.declined,
        run.stats.failed,
        average
    );
    Ok(())
}

pub(crate) fn qualify_export(args: DemoArgs) -> Result<DemoRun, AppError> {
    let DemoArgs {
        csv,
        pro,
        today,
        default_jurisdiction,
    } = args;

    let records = match csv {
        Some(path) => IntakeCsvImporter::from_path(path, &default_jurisdiction)?,
        None => IntakeCsvImporter::from_reader(Cursor::new(SAMPLE_EXPORT), &default_jurisdiction)?,
    };
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let mode = if pro {
        OperationMode::Pro
    } else {
        OperationMode::Starter
    };

    let store = Arc::new(InMemoryLeadStore::new(records));
    let history = Arc::new(ProcessingHistory::default());
    let processor = LeadProcessor::new(
        ProcessorParts {
            store: store.clone(),
            completions: Arc::new(KeywordCompletionClient),
            cases: Arc::new(LogCaseManager::default()),
            notifier: Arc::new(LogNotifier),
            catalog: Arc::new(JurisdictionCatalog::bundled()),
            clock: Arc::new(FixedClock::on(today)),
            history: history.clone(),
        },
        ProcessorConfig {
            mode,
            intake_recipient: Some("intake@demo.local".to_string()),
            ..ProcessorConfig::default()
        },
    );

    let report = processor.process_pending(&ShutdownSignal::new())?;

    Ok(DemoRun {
        today,
        mode,
        report,
        records: store.records(),
        stats: history.stats(),
    })
}

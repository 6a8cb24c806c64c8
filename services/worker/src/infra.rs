use chrono::NaiveDate;
use lead_qualifier::config::{
    AppConfig, CaseBackend, CompletionBackend, LeadStoreBackend, NotificationBackend,
    PipelineConfig,
};
use lead_qualifier::error::AppError;
use lead_qualifier::integrations::{
    AirtableLeadStore, ClioCaseManager, KeywordCompletionClient, LogCaseManager, LogNotifier,
    OpenAiCompletionClient, WebhookNotifier,
};
use lead_qualifier::workflows::import::IntakeCsvImporter;
use lead_qualifier::workflows::intake::{
    CaseManagement, CompletionClient, DirectoryJurisdictions, JurisdictionCatalog, LeadId,
    LeadProcessor, LeadRecord, LeadStore, LeadUpdate, Notifier, ProcessingHistory,
    ProcessorParts, ShutdownSignal, StoreError, SystemClock,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Processor wired to whichever adapters the environment selects.
pub(crate) type DynProcessor =
    LeadProcessor<dyn LeadStore, dyn CompletionClient, dyn CaseManagement, dyn Notifier>;

/// Record store kept in process memory, seeded from a CSV export.
#[derive(Default, Clone)]
pub(crate) struct InMemoryLeadStore {
    records: Arc<Mutex<Vec<LeadRecord>>>,
}

impl InMemoryLeadStore {
    pub(crate) fn new(records: Vec<LeadRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    pub(crate) fn records(&self) -> Vec<LeadRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LeadStore for InMemoryLeadStore {
    fn fetch_pending(&self) -> Result<Vec<LeadRecord>, StoreError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .iter()
            .filter(|record| !record.status.is_terminal())
            .cloned()
            .collect())
    }

    fn update(&self, id: &LeadId, update: LeadUpdate) -> Result<(), StoreError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let record = guard
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(StoreError::NotFound)?;
        record.apply(&update);
        Ok(())
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<LeadRecord>, StoreError> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }
}

pub(crate) fn jurisdiction_catalog(pipeline: &PipelineConfig) -> JurisdictionCatalog {
    match &pipeline.jurisdiction_dir {
        Some(dir) => JurisdictionCatalog::new(Box::new(DirectoryJurisdictions::new(dir.clone()))),
        None => JurisdictionCatalog::bundled(),
    }
}

/// Builds the processor from configuration. The HTTP adapters use blocking clients, so call
/// this from a plain OS thread rather than from inside the async runtime.
pub(crate) fn build_processor(
    config: &AppConfig,
    catalog: Arc<JurisdictionCatalog>,
    history: Arc<ProcessingHistory>,
) -> Result<DynProcessor, AppError> {
    let integrations = &config.integrations;
    let timeout = integrations.request_timeout;
    let default_jurisdiction = &config.pipeline.default_jurisdiction;

    let store: Arc<dyn LeadStore> = match &integrations.lead_store {
        LeadStoreBackend::Memory { seed_csv } => {
            let records = match seed_csv {
                Some(path) => IntakeCsvImporter::from_path(path, default_jurisdiction)?,
                None => Vec::new(),
            };
            info!(records = records.len(), "using in-memory lead store");
            Arc::new(InMemoryLeadStore::new(records))
        }
        LeadStoreBackend::Airtable(airtable) => Arc::new(AirtableLeadStore::new(
            airtable.clone(),
            default_jurisdiction.clone(),
            timeout,
        )?),
    };

    let completions: Arc<dyn CompletionClient> = match &integrations.completions {
        CompletionBackend::Offline => Arc::new(KeywordCompletionClient),
        CompletionBackend::OpenAi(openai) => {
            Arc::new(OpenAiCompletionClient::new(openai.clone(), timeout)?)
        }
    };

    let cases: Arc<dyn CaseManagement> = match &integrations.cases {
        CaseBackend::Log => Arc::new(LogCaseManager::default()),
        CaseBackend::Clio(clio) => Arc::new(ClioCaseManager::new(clio.clone(), timeout)?),
    };

    let notifier: Arc<dyn Notifier> = match &integrations.notifications {
        NotificationBackend::Log => Arc::new(LogNotifier),
        NotificationBackend::Webhook { url } => {
            Arc::new(WebhookNotifier::new(url.clone(), timeout)?)
        }
    };

    Ok(LeadProcessor::new(
        ProcessorParts {
            store,
            completions,
            cases,
            notifier,
            catalog,
            clock: Arc::new(SystemClock),
            history,
        },
        config.pipeline.processor_config(),
    ))
}

/// Runs blocking work on a dedicated OS thread and waits for it.
pub(crate) fn off_runtime<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    std::thread::spawn(task)
        .join()
        .map_err(|_| AppError::Io(std::io::Error::other("command thread panicked")))?
}

/// Like [`off_runtime`], but a completed `stop` future triggers the shutdown signal handed to
/// `task` and then waits for the task to wind down.
pub(crate) async fn off_runtime_until<T, F, Stop>(stop: Stop, task: F) -> Result<T, AppError>
where
    F: FnOnce(Arc<ShutdownSignal>) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
    Stop: Future<Output = ()>,
{
    let shutdown = Arc::new(ShutdownSignal::new());
    let (done_tx, mut done_rx) = oneshot::channel();
    let signal = shutdown.clone();
    std::thread::Builder::new()
        .name("lead-cycle".to_string())
        .spawn(move || {
            let _ = done_tx.send(task(signal));
        })?;

    let finished = tokio::select! {
        result = &mut done_rx => Some(result),
        _ = stop => None,
    };
    let result = match finished {
        Some(result) => result,
        None => {
            shutdown.trigger();
            done_rx.await
        }
    };
    result.map_err(|_| AppError::Io(std::io::Error::other("command thread panicked")))?
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::intake::{
    CaseError, CaseManagement, CompletionClient, CompletionError, FixedClock, JurisdictionCatalog,
    LeadId, LeadProcessor, LeadRecord, LeadStatus, LeadStore, LeadUpdate, Notification,
    NotificationError, Notifier, OperationMode, ProcessingHistory, ProcessorConfig,
    ProcessorParts, StoreError,
};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Charleston rear-end collision from a year ago: eligible and in the preferred service area.
pub(super) fn lead(id: &str) -> LeadRecord {
    LeadRecord {
        id: LeadId(id.to_string()),
        name: "Dana Smith".to_string(),
        email: Some("dana@example.com".to_string()),
        phone: Some("843-555-0100".to_string()),
        injury_date: Some(date(2024, 6, 1)),
        jurisdiction: "SC".to_string(),
        county: Some("Charleston".to_string()),
        accident_location: Some("I-26 near Meeting St".to_string()),
        case_type: "Auto Accident".to_string(),
        description: "Rear-ended at a red light, treated in the ER, now in physical therapy."
            .to_string(),
        status: LeadStatus::New,
        last_error: None,
        qualification: None,
    }
}

pub(super) fn scored(score: f32) -> String {
    format!(
        "{{\"score\": {score}, \"analysis\": \"Clear liability with documented treatment.\", \"red_flags\": [], \"confidence\": 80}}"
    )
}

pub(super) fn config(mode: OperationMode) -> ProcessorConfig {
    ProcessorConfig {
        mode,
        max_retries: 2,
        retry_delay: Duration::ZERO,
        intake_recipient: Some("intake@firm.example".to_string()),
        ..ProcessorConfig::default()
    }
}

pub(super) type TestProcessor =
    LeadProcessor<MemoryStore, ScriptedCompletions, RecordingCases, RecordingNotifier>;

pub(super) struct Harness {
    pub(super) processor: TestProcessor,
    pub(super) store: Arc<MemoryStore>,
    pub(super) completions: Arc<ScriptedCompletions>,
    pub(super) cases: Arc<RecordingCases>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) history: Arc<ProcessingHistory>,
}

pub(super) fn harness(
    config: ProcessorConfig,
    records: Vec<LeadRecord>,
    completions: ScriptedCompletions,
) -> Harness {
    let store = Arc::new(MemoryStore::with_records(records));
    let completions = Arc::new(completions);
    let cases = Arc::new(RecordingCases::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let history = Arc::new(ProcessingHistory::default());

    let processor = LeadProcessor::new(
        ProcessorParts {
            store: store.clone(),
            completions: completions.clone(),
            cases: cases.clone(),
            notifier: notifier.clone(),
            catalog: Arc::new(JurisdictionCatalog::bundled()),
            clock: Arc::new(FixedClock::on(today())),
            history: history.clone(),
        },
        config,
    );

    Harness {
        processor,
        store,
        completions,
        cases,
        notifier,
        history,
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    records: Mutex<Vec<LeadRecord>>,
    updates: Mutex<Vec<(LeadId, LeadUpdate)>>,
    update_failures: Mutex<VecDeque<StoreError>>,
}

impl MemoryStore {
    pub(super) fn with_records(records: Vec<LeadRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub(super) fn get(&self, id: &str) -> LeadRecord {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .find(|record| record.id.as_str() == id)
            .cloned()
            .expect("record present")
    }

    pub(super) fn remove(&self, id: &str) {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .retain(|record| record.id.as_str() != id);
    }

    pub(super) fn updates(&self) -> Vec<(LeadId, LeadUpdate)> {
        self.updates.lock().expect("store mutex poisoned").clone()
    }

    pub(super) fn statuses_written(&self, id: &str) -> Vec<LeadStatus> {
        self.updates()
            .into_iter()
            .filter(|(lead, _)| lead.as_str() == id)
            .filter_map(|(_, update)| update.status)
            .collect()
    }

    pub(super) fn fail_next_update(&self, error: StoreError) {
        self.update_failures
            .lock()
            .expect("store mutex poisoned")
            .push_back(error);
    }
}

impl LeadStore for MemoryStore {
    fn fetch_pending(&self) -> Result<Vec<LeadRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| !record.status.is_terminal())
            .cloned()
            .collect())
    }

    fn update(&self, id: &LeadId, update: LeadUpdate) -> Result<(), StoreError> {
        if let Some(error) = self
            .update_failures
            .lock()
            .expect("store mutex poisoned")
            .pop_front()
        {
            return Err(error);
        }

        let mut guard = self.records.lock().expect("store mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(StoreError::NotFound)?;
        record.apply(&update);
        self.updates
            .lock()
            .expect("store mutex poisoned")
            .push((id.clone(), update));
        Ok(())
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<LeadRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }
}

/// Replays queued responses, then repeats the fallback.
pub(super) struct ScriptedCompletions {
    queued: Mutex<VecDeque<Result<String, CompletionError>>>,
    fallback: Result<String, CompletionError>,
    calls: AtomicUsize,
}

impl ScriptedCompletions {
    pub(super) fn always(response: Result<String, CompletionError>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: response,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn scoring(score: f32) -> Self {
        Self::always(Ok(scored(score)))
    }

    pub(super) fn then(self, response: Result<String, CompletionError>) -> Self {
        self.queued
            .lock()
            .expect("completion mutex poisoned")
            .push_back(response);
        self
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionClient for ScriptedCompletions {
    fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let queued = self
            .queued
            .lock()
            .expect("completion mutex poisoned")
            .pop_front();
        queued.unwrap_or_else(|| self.fallback.clone())
    }
}

#[derive(Default)]
pub(super) struct RecordingCases {
    created: Mutex<Vec<LeadId>>,
    failures: Mutex<VecDeque<CaseError>>,
}

impl RecordingCases {
    pub(super) fn created(&self) -> Vec<LeadId> {
        self.created.lock().expect("case mutex poisoned").clone()
    }

    pub(super) fn fail_next(&self, error: CaseError) {
        self.failures
            .lock()
            .expect("case mutex poisoned")
            .push_back(error);
    }
}

impl CaseManagement for RecordingCases {
    fn create_case(&self, record: &LeadRecord) -> Result<String, CaseError> {
        if let Some(error) = self.failures.lock().expect("case mutex poisoned").pop_front() {
            return Err(error);
        }
        let mut created = self.created.lock().expect("case mutex poisoned");
        created.push(record.id.clone());
        Ok(format!("matter-{}", created.len()))
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    /// Scripted results for upcoming sends; `None` delivers normally.
    script: Mutex<VecDeque<Option<NotificationError>>>,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn fail_next(&self, error: NotificationError) {
        self.script
            .lock()
            .expect("notifier mutex poisoned")
            .push_back(Some(error));
    }

    pub(super) fn deliver_then_fail(&self, error: NotificationError) {
        let mut script = self.script.lock().expect("notifier mutex poisoned");
        script.push_back(None);
        script.push_back(Some(error));
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        let scripted = self
            .script
            .lock()
            .expect("notifier mutex poisoned")
            .pop_front();
        if let Some(Some(error)) = scripted {
            return Err(error);
        }
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

//! End-to-end qualification of an intake export through the public processor API, using the
//! offline adapters in place of the record store, model, and practice-management system.

mod common {
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;

    use lead_qualifier::integrations::{KeywordCompletionClient, LogCaseManager, LogNotifier};
    use lead_qualifier::workflows::intake::{
        FixedClock, JurisdictionCatalog, LeadId, LeadProcessor, LeadRecord, LeadStore,
        LeadUpdate, OperationMode, ProcessingHistory, ProcessorConfig, ProcessorParts,
        StoreError,
    };

    pub(super) const EXPORT: &str = "\
Record ID,Lead Name,Email Address,Phone Number,Accident Date,Jurisdiction,County,Accident Location,Case Type,Lead Information Summary,Processing Status
rec-accept,Dana Smith,dana@example.com,843-555-0100,2025-03-14,SC,Charleston,I-26 at Meeting St,Auto Accident,\"Rear-ended by a drunk driver, taken to the emergency room, broken wrist needed surgery.\",
rec-review,Sam Lee,sam@example.com,,2025-01-20,WA,,\"N Division St, Spokane County\",Premises Liability,\"Slipped on a wet floor at a grocery store, went to the hospital, now in physical therapy.\",
rec-expired,Pat Jones,pat@example.com,,2020-02-01,SC,Greenville,,Auto Accident,Sideswiped on I-85.,
";

    #[derive(Default)]
    pub(super) struct VecStore {
        records: Mutex<Vec<LeadRecord>>,
    }

    impl VecStore {
        pub(super) fn new(records: Vec<LeadRecord>) -> Self {
            Self {
                records: Mutex::new(records),
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
    }

    impl LeadStore for VecStore {
        fn fetch_pending(&self) -> Result<Vec<LeadRecord>, StoreError> {
            let guard = self.records.lock().expect("store mutex poisoned");
            Ok(guard
                .iter()
                .filter(|record| !record.status.is_terminal())
                .cloned()
                .collect())
        }

        fn update(&self, id: &LeadId, update: LeadUpdate) -> Result<(), StoreError> {
            let mut guard = self.records.lock().expect("store mutex poisoned");
            let record = guard
                .iter_mut()
                .find(|record| &record.id == id)
                .ok_or(StoreError::NotFound)?;
            record.apply(&update);
            Ok(())
        }

        fn fetch(&self, id: &LeadId) -> Result<Option<LeadRecord>, StoreError> {
            let guard = self.records.lock().expect("store mutex poisoned");
            Ok(guard.iter().find(|record| &record.id == id).cloned())
        }
    }

    pub(super) type OfflineProcessor =
        LeadProcessor<VecStore, KeywordCompletionClient, LogCaseManager, LogNotifier>;

    pub(super) fn processor(
        records: Vec<LeadRecord>,
        mode: OperationMode,
    ) -> (OfflineProcessor, Arc<VecStore>) {
        let store = Arc::new(VecStore::new(records));
        let config = ProcessorConfig {
            mode,
            intake_recipient: Some("intake@firm.example".to_string()),
            ..ProcessorConfig::default()
        };
        let processor = LeadProcessor::new(
            ProcessorParts {
                store: store.clone(),
                completions: Arc::new(KeywordCompletionClient),
                cases: Arc::new(LogCaseManager::default()),
                notifier: Arc::new(LogNotifier),
                catalog: Arc::new(JurisdictionCatalog::bundled()),
                clock: Arc::new(FixedClock::on(
                    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"),
                )),
                history: Arc::new(ProcessingHistory::default()),
            },
            config,
        );
        (processor, store)
    }
}

use std::io::Cursor;

use common::*;
use lead_qualifier::workflows::import::IntakeCsvImporter;
use lead_qualifier::workflows::intake::{
    DecisionBasis, LeadStatus, OperationMode, ShutdownSignal, Tier,
};

#[test]
fn export_is_qualified_into_all_three_tiers() {
    let records = IntakeCsvImporter::from_reader(Cursor::new(EXPORT), "SC").expect("export parses");
    assert_eq!(records.len(), 3);
    let (processor, store) = processor(records, OperationMode::Pro);

    let report = processor
        .process_pending(&ShutdownSignal::new())
        .expect("cycle runs");

    assert_eq!(report.completed(), 3);
    assert_eq!(report.tier_count(Tier::AutoAccept), 1);
    assert_eq!(report.tier_count(Tier::Review), 1);
    assert_eq!(report.tier_count(Tier::Decline), 1);

    let accepted = store.get("rec-accept");
    assert_eq!(accepted.status, LeadStatus::Completed);
    let result = accepted.qualification.expect("result persisted");
    assert_eq!(result.tier, Tier::AutoAccept);
    assert_eq!(result.score, Some(95.0));
    assert_eq!(result.case_id.as_deref(), Some("local-00001"));
    assert!(result.side_effects_applied);

    let review = store.get("rec-review").qualification.expect("result persisted");
    assert_eq!(review.tier, Tier::Review);
    assert_eq!(review.score, Some(50.0));
    assert!(review.case_id.is_none());

    let expired = store.get("rec-expired").qualification.expect("result persisted");
    assert_eq!(expired.basis, DecisionBasis::Rule);
    assert!(expired.score.is_none());

    let stats = processor.history().stats();
    assert_eq!(stats.processed, 3);
    assert_eq!(stats.average_score, Some(72.5));
}

#[test]
fn second_cycle_finds_nothing_left_to_do() {
    let records = IntakeCsvImporter::from_reader(Cursor::new(EXPORT), "SC").expect("export parses");
    let (processor, _store) = processor(records, OperationMode::Starter);

    processor
        .process_pending(&ShutdownSignal::new())
        .expect("first cycle");
    let report = processor
        .process_pending(&ShutdownSignal::new())
        .expect("second cycle");

    assert_eq!(report.fetched(), 0);
}

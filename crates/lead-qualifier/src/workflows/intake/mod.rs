//! Lead qualification pipeline: jurisdiction reference data, deterministic eligibility rules,
//! AI suitability scoring, tier decisions, and the resumable processor that applies them.

pub mod clock;
pub mod decision;
pub mod domain;
pub mod eligibility;
pub mod history;
pub mod jurisdiction;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod worker;

#[cfg(test)]
mod tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use decision::{ScoringThresholds, ThresholdError, TierDecisionEngine};
pub use domain::{
    DecisionBasis, LeadId, LeadRecord, LeadStatus, LeadUpdate, OperationMode,
    QualificationResult, Tier,
};
pub use eligibility::{
    EligibilityConfig, EligibilityEvaluator, EligibilityOutcome, EligibilityRule, RuleCheck,
};
pub use history::{HistoryEntry, HistoryStats, ProcessingHistory};
pub use jurisdiction::{
    BundledJurisdictions, DirectoryJurisdictions, JurisdictionCatalog, JurisdictionError,
    JurisdictionProfile, JurisdictionSource, StatuteDuration,
};
pub use repository::{
    CaseError, CaseManagement, LeadStore, Notification, NotificationError, NotificationTemplate,
    Notifier, StoreError,
};
pub use router::status_router;
pub use scoring::{
    CompletionClient, CompletionError, ScoringConfig, ScoringError, SuitabilityAssessment,
    SuitabilityScorer,
};
pub use service::{
    CycleReport, LeadProcessor, ProcessingError, ProcessorConfig, ProcessorParts, RecordOutcome,
};
pub use worker::{PollingWorker, ShutdownSignal};

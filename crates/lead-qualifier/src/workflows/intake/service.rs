use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::decision::{ScoringThresholds, TierDecisionEngine};
use super::domain::{
    LeadId, LeadRecord, LeadStatus, LeadUpdate, OperationMode, QualificationResult, Tier,
};
use super::eligibility::{EligibilityConfig, EligibilityEvaluator};
use super::history::{HistoryEntry, ProcessingHistory};
use super::jurisdiction::{JurisdictionCatalog, JurisdictionError};
use super::repository::{
    CaseError, CaseManagement, LeadStore, Notification, NotificationError, NotificationTemplate,
    Notifier, StoreError,
};
use super::scoring::{CompletionClient, ScoringConfig, ScoringError, SuitabilityScorer};
use super::worker::ShutdownSignal;

/// Runtime knobs for the processor, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub mode: OperationMode,
    pub thresholds: ScoringThresholds,
    pub eligibility: EligibilityConfig,
    pub scoring: ScoringConfig,
    /// Additional attempts after the first for retryable failures.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub send_decline_notices: bool,
    /// Intake team address for accept/review/failure notifications.
    pub intake_recipient: Option<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            mode: OperationMode::Starter,
            thresholds: ScoringThresholds::default(),
            eligibility: EligibilityConfig::default(),
            scoring: ScoringConfig::default(),
            max_retries: 3,
            retry_delay: Duration::from_secs(30),
            send_decline_notices: false,
            intake_recipient: None,
        }
    }
}

/// Outcome of one record within a poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Completed(QualificationResult),
    Failed(String),
    /// Record vanished from the store mid-run; nothing was written.
    Skipped(String),
    /// Shutdown arrived while waiting to retry; the record resumes on the next run.
    Deferred,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub outcomes: Vec<(LeadId, RecordOutcome)>,
    /// True when shutdown stopped the cycle before every pending record was visited.
    pub interrupted: bool,
}

impl CycleReport {
    pub fn fetched(&self) -> usize {
        self.outcomes.len()
    }

    pub fn completed(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Completed(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Failed(_)))
    }

    pub fn tier_count(&self, tier: Tier) -> usize {
        self.count(|outcome| matches!(outcome, RecordOutcome::Completed(result) if result.tier == tier))
    }

    fn count(&self, predicate: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }
}

/// Error raised while advancing a record through the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("record {0} not found in the store")]
    NotFound(LeadId),
    #[error(transparent)]
    Jurisdiction(#[from] JurisdictionError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("case creation failed: {0}")]
    CaseCreation(#[from] CaseError),
    #[error("notification failed: {0}")]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Store(StoreError),
    #[error("record {id} is {status:?} and cannot be requeued")]
    NotRequeueable { id: LeadId, status: LeadStatus },
}

impl ProcessingError {
    /// Transient scoring, side-effect, and store-availability failures are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProcessingError::Scoring(error) => matches!(error, ScoringError::Transient(_)),
            ProcessingError::CaseCreation(_) | ProcessingError::Notification(_) => true,
            ProcessingError::Store(error) => error.is_transient(),
            ProcessingError::NotFound(_)
            | ProcessingError::Jurisdiction(_)
            | ProcessingError::NotRequeueable { .. } => false,
        }
    }

    fn from_store(id: &LeadId, error: StoreError) -> Self {
        match error {
            StoreError::NotFound => ProcessingError::NotFound(id.clone()),
            other => ProcessingError::Store(other),
        }
    }
}

/// Drives records through `NEW -> IN_PROGRESS -> SCORED -> COMPLETED`, resuming from the last
/// persisted step and dispatching side effects at most once.
pub struct LeadProcessor<S: ?Sized, C: ?Sized, M: ?Sized, N: ?Sized> {
    store: Arc<S>,
    scorer: SuitabilityScorer<C>,
    cases: Arc<M>,
    notifier: Arc<N>,
    catalog: Arc<JurisdictionCatalog>,
    evaluator: EligibilityEvaluator,
    engine: TierDecisionEngine,
    clock: Arc<dyn Clock>,
    history: Arc<ProcessingHistory>,
    config: ProcessorConfig,
}

/// Capability handles the processor is built from.
pub struct ProcessorParts<S: ?Sized, C: ?Sized, M: ?Sized, N: ?Sized> {
    pub store: Arc<S>,
    pub completions: Arc<C>,
    pub cases: Arc<M>,
    pub notifier: Arc<N>,
    pub catalog: Arc<JurisdictionCatalog>,
    pub clock: Arc<dyn Clock>,
    pub history: Arc<ProcessingHistory>,
}

impl<S, C, M, N> LeadProcessor<S, C, M, N>
where
    S: LeadStore + ?Sized,
    C: CompletionClient + ?Sized,
    M: CaseManagement + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(parts: ProcessorParts<S, C, M, N>, config: ProcessorConfig) -> Self {
        Self {
            store: parts.store,
            scorer: SuitabilityScorer::new(parts.completions, config.scoring.clone()),
            cases: parts.cases,
            notifier: parts.notifier,
            catalog: parts.catalog,
            evaluator: EligibilityEvaluator::new(config.eligibility.clone()),
            engine: TierDecisionEngine::new(config.thresholds),
            clock: parts.clock,
            history: parts.history,
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<ProcessingHistory> {
        &self.history
    }

    /// Fetch pending records and process them one at a time in store order. Shutdown is
    /// honored between records.
    pub fn process_pending(
        &self,
        shutdown: &ShutdownSignal,
    ) -> Result<CycleReport, ProcessingError> {
        let pending = self.store.fetch_pending().map_err(ProcessingError::Store)?;
        tracing::info!(count = pending.len(), mode = self.config.mode.label(), "fetched pending leads");

        let mut report = CycleReport::default();
        for record in pending {
            if shutdown.is_triggered() {
                tracing::info!("shutdown requested, stopping before next lead");
                report.interrupted = true;
                break;
            }
            let id = record.id.clone();
            let outcome = self.process_record(record, shutdown);
            report.outcomes.push((id, outcome));
        }
        Ok(report)
    }

    /// Advance one record to a terminal state, retrying retryable failures with a fixed delay.
    pub fn process_record(&self, record: LeadRecord, shutdown: &ShutdownSignal) -> RecordOutcome {
        let mut record = record;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.advance(&mut record) {
                Ok(result) => {
                    self.remember(&record, LeadStatus::Completed, Some(&result), result.reason.clone());
                    return RecordOutcome::Completed(result);
                }
                Err(ProcessingError::NotFound(id)) => {
                    tracing::warn!(lead_id = %id, "lead no longer in store, skipping");
                    return RecordOutcome::Skipped(format!("record {id} not found"));
                }
                Err(error) if error.is_retryable() && attempt <= self.config.max_retries => {
                    tracing::warn!(
                        lead_id = %record.id,
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %error,
                        "retryable failure, will retry"
                    );
                    if shutdown.wait_timeout(self.config.retry_delay) {
                        tracing::info!(lead_id = %record.id, "shutdown during retry wait, deferring lead");
                        return RecordOutcome::Deferred;
                    }
                }
                Err(error) => {
                    let message = error.to_string();
                    self.mark_failed(&mut record, &message);
                    return RecordOutcome::Failed(message);
                }
            }
        }
    }

    /// Reset a terminal record to `NEW`. Persisted qualification flags are kept so reprocessing
    /// does not repeat confirmed side effects.
    pub fn requeue(&self, id: &LeadId) -> Result<LeadRecord, ProcessingError> {
        let mut record = self
            .store
            .fetch(id)
            .map_err(|error| ProcessingError::from_store(id, error))?
            .ok_or_else(|| ProcessingError::NotFound(id.clone()))?;

        if !record.status.is_terminal() {
            return Err(ProcessingError::NotRequeueable {
                id: id.clone(),
                status: record.status,
            });
        }

        let update = LeadUpdate::status(LeadStatus::New).clearing_error();
        self.persist(&mut record, update)?;
        tracing::info!(lead_id = %id, "lead requeued");
        Ok(record)
    }

    fn advance(&self, record: &mut LeadRecord) -> Result<QualificationResult, ProcessingError> {
        if record.status == LeadStatus::New || record.status.is_terminal() {
            self.persist(record, LeadUpdate::status(LeadStatus::InProgress))?;
            tracing::debug!(lead_id = %record.id, "lead marked in progress");
        }

        let mut result = match (record.status, record.qualification.clone()) {
            (LeadStatus::Scored, Some(result)) => result,
            (_, previous) => {
                let mut result = self.qualify(record)?;
                if let Some(previous) = previous {
                    result.case_id = previous.case_id;
                    result.notified = previous.notified;
                    result.side_effects_applied = previous.side_effects_applied;
                }
                let update = LeadUpdate::status(LeadStatus::Scored).with_qualification(result.clone());
                self.persist(record, update)?;
                tracing::info!(
                    lead_id = %record.id,
                    tier = result.tier.label(),
                    score = ?result.score,
                    "lead scored"
                );
                result
            }
        };

        if self.config.mode.dispatches_side_effects() && !result.side_effects_applied {
            self.dispatch(record, &mut result)?;
            result.side_effects_applied = true;
            let update = LeadUpdate::default().with_qualification(result.clone());
            self.persist(record, update)?;
        }

        self.persist(
            record,
            LeadUpdate::status(LeadStatus::Completed).clearing_error(),
        )?;
        tracing::info!(lead_id = %record.id, tier = result.tier.label(), "lead completed");
        Ok(result)
    }

    fn qualify(&self, record: &LeadRecord) -> Result<QualificationResult, ProcessingError> {
        let profile = self.catalog.profile_for(&record.jurisdiction)?;
        let today = self.clock.today();

        let eligibility = self.evaluator.evaluate(record, &profile, today);
        if let Some(reason) = &eligibility.reason {
            tracing::info!(lead_id = %record.id, reason = %reason, "lead disqualified by rules");
        }

        let assessment = self.scorer.assess(record, &profile, &eligibility, today)?;
        Ok(self
            .engine
            .decide(&eligibility, assessment.as_ref(), self.clock.now()))
    }

    /// Tier-specific side effects. A created case id and every confirmed notification are
    /// persisted before the next step runs, so a retry resumes after the last confirmed one.
    fn dispatch(
        &self,
        record: &mut LeadRecord,
        result: &mut QualificationResult,
    ) -> Result<(), ProcessingError> {
        match result.tier {
            Tier::AutoAccept => {
                if result.case_id.is_none() {
                    let case_id = self.cases.create_case(record)?;
                    tracing::info!(lead_id = %record.id, case_id = %case_id, "case created");
                    result.case_id = Some(case_id);
                    let update = LeadUpdate::default().with_qualification(result.clone());
                    self.persist(record, update)?;
                }
                self.notify_intake(record, result, NotificationTemplate::AutoAccepted)?;
            }
            Tier::Review => {
                self.notify_intake(record, result, NotificationTemplate::ReviewRequested)?;
            }
            Tier::Decline => {
                if self.config.send_decline_notices {
                    self.notify_intake(record, result, NotificationTemplate::Declined)?;
                    let email = record
                        .email
                        .as_deref()
                        .map(str::trim)
                        .filter(|email| !email.is_empty())
                        .map(str::to_string);
                    if let Some(email) = email {
                        self.send_once(record, result, email, NotificationTemplate::LeadReferral)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn notify_intake(
        &self,
        record: &mut LeadRecord,
        result: &mut QualificationResult,
        template: NotificationTemplate,
    ) -> Result<(), ProcessingError> {
        let Some(recipient) = self.config.intake_recipient.clone() else {
            tracing::debug!(lead_id = %record.id, ?template, "no intake recipient configured");
            return Ok(());
        };
        self.send_once(record, result, recipient, template)
    }

    fn send_once(
        &self,
        record: &mut LeadRecord,
        result: &mut QualificationResult,
        recipient: String,
        template: NotificationTemplate,
    ) -> Result<(), ProcessingError> {
        if result.notified.contains(&template) {
            tracing::debug!(lead_id = %record.id, ?template, "notification already sent");
            return Ok(());
        }
        self.notifier.send(Notification {
            recipient,
            template,
            lead_id: record.id.clone(),
            context: notification_context(record, result),
        })?;
        result.notified.push(template);
        let update = LeadUpdate::default().with_qualification(result.clone());
        self.persist(record, update)
    }

    fn mark_failed(&self, record: &mut LeadRecord, message: &str) {
        tracing::error!(lead_id = %record.id, error = %message, "lead processing failed");

        let update = LeadUpdate::status(LeadStatus::Failed).with_error(message);
        if let Err(error) = self.persist(record, update) {
            tracing::error!(lead_id = %record.id, error = %error, "could not record failure");
        }

        if self.config.mode.dispatches_side_effects() {
            if let Some(recipient) = self.config.intake_recipient.as_deref() {
                let mut context = BTreeMap::new();
                context.insert("lead_name".to_string(), record.name.clone());
                context.insert("error".to_string(), message.to_string());
                let notification = Notification {
                    recipient: recipient.to_string(),
                    template: NotificationTemplate::ProcessingFailed,
                    lead_id: record.id.clone(),
                    context,
                };
                if let Err(error) = self.notifier.send(notification) {
                    tracing::warn!(lead_id = %record.id, error = %error, "failure notification not sent");
                }
            }
        }

        self.remember(record, LeadStatus::Failed, record.qualification.as_ref(), message.to_string());
    }

    fn persist(&self, record: &mut LeadRecord, update: LeadUpdate) -> Result<(), ProcessingError> {
        self.store
            .update(&record.id, update.clone())
            .map_err(|error| ProcessingError::from_store(&record.id, error))?;
        record.apply(&update);
        Ok(())
    }

    fn remember(
        &self,
        record: &LeadRecord,
        status: LeadStatus,
        result: Option<&QualificationResult>,
        detail: String,
    ) {
        self.history.record(HistoryEntry {
            lead_id: record.id.clone(),
            name: record.name.clone(),
            status,
            tier: result.map(|result| result.tier),
            score: result.and_then(|result| result.score),
            detail,
            case_id: result.and_then(|result| result.case_id.clone()),
            recorded_at: self.clock.now(),
        });
    }
}

fn notification_context(record: &LeadRecord, result: &QualificationResult) -> BTreeMap<String, String> {
    let mut context = BTreeMap::new();
    context.insert("lead_name".to_string(), record.name.clone());
    context.insert("tier".to_string(), result.tier.label().to_string());
    context.insert("reason".to_string(), result.reason.clone());
    context.insert("case_type".to_string(), record.case_type.clone());
    context.insert("jurisdiction".to_string(), record.jurisdiction.clone());
    if let Some(score) = result.score {
        context.insert("score".to_string(), format!("{score:.0}"));
    }
    if let Some(rationale) = &result.rationale {
        context.insert("rationale".to_string(), rationale.clone());
    }
    if let Some(case_id) = &result.case_id {
        context.insert("case_id".to_string(), case_id.clone());
    }
    if let Some(email) = &record.email {
        context.insert("lead_email".to_string(), email.clone());
    }
    if let Some(phone) = &record.phone {
        context.insert("lead_phone".to_string(), phone.clone());
    }
    context
}

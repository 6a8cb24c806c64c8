mod policy;
mod thresholds;

pub use thresholds::{ScoringThresholds, ThresholdError};

pub(crate) use policy::ASSESSMENT_UNAVAILABLE;

use chrono::{DateTime, Utc};

use super::domain::QualificationResult;
use super::eligibility::EligibilityOutcome;
use super::scoring::SuitabilityAssessment;

/// Pure mapping from rule outcome and assessment to a handling tier.
#[derive(Debug, Clone, Default)]
pub struct TierDecisionEngine {
    thresholds: ScoringThresholds,
}

impl TierDecisionEngine {
    pub fn new(thresholds: ScoringThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ScoringThresholds {
        &self.thresholds
    }

    /// Same inputs always yield the same tier and reason. `decided_at` is supplied by the caller.
    pub fn decide(
        &self,
        eligibility: &EligibilityOutcome,
        assessment: Option<&SuitabilityAssessment>,
        decided_at: DateTime<Utc>,
    ) -> QualificationResult {
        let verdict = policy::decide_tier(eligibility, assessment, &self.thresholds);

        QualificationResult {
            tier: verdict.tier,
            basis: verdict.basis,
            reason: verdict.reason,
            score: assessment.map(|assessment| assessment.score),
            rationale: assessment.map(SuitabilityAssessment::summary),
            decided_at,
            case_id: None,
            notified: Vec::new(),
            side_effects_applied: false,
        }
    }
}

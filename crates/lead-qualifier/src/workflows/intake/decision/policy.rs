use super::super::domain::{DecisionBasis, Tier};
use super::super::eligibility::EligibilityOutcome;
use super::super::scoring::SuitabilityAssessment;
use super::thresholds::ScoringThresholds;

pub(crate) const ASSESSMENT_UNAVAILABLE: &str = "AI assessment unavailable — manual review required";

/// Tier, basis, and reason before timestamping.
pub(crate) struct Verdict {
    pub tier: Tier,
    pub basis: DecisionBasis,
    pub reason: String,
}

/// Rule disqualification outranks everything, an unusable assessment outranks the score.
pub(crate) fn decide_tier(
    eligibility: &EligibilityOutcome,
    assessment: Option<&SuitabilityAssessment>,
    thresholds: &ScoringThresholds,
) -> Verdict {
    if eligibility.disqualified {
        return Verdict {
            tier: Tier::Decline,
            basis: DecisionBasis::Rule,
            reason: eligibility
                .reason
                .clone()
                .unwrap_or_else(|| "disqualified by eligibility rules".to_string()),
        };
    }

    let Some(assessment) = assessment.filter(|assessment| assessment.confidence) else {
        return Verdict {
            tier: Tier::Review,
            basis: DecisionBasis::AssessmentUnavailable,
            reason: ASSESSMENT_UNAVAILABLE.to_string(),
        };
    };

    let tier = thresholds.tier_for(assessment.score);
    let reason = match tier {
        Tier::AutoAccept => format!(
            "score {:.1} is above the accept threshold {:.1}",
            assessment.score,
            thresholds.accept()
        ),
        Tier::Review => format!(
            "score {:.1} is above the review threshold {:.1} but not above {:.1}",
            assessment.score,
            thresholds.review(),
            thresholds.accept()
        ),
        Tier::Decline => format!(
            "score {:.1} is at or below the review threshold {:.1}",
            assessment.score,
            thresholds.review()
        ),
    };

    Verdict {
        tier,
        basis: DecisionBasis::Score,
        reason,
    }
}

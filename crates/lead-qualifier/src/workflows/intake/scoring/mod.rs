mod parser;
mod prompt;

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::LeadRecord;
use super::eligibility::EligibilityOutcome;
use super::jurisdiction::JurisdictionProfile;

/// Text-completion capability backing the suitability score.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Failure reported by a completion backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error("completion backend temporarily unavailable: {0}")]
    Transient(String),
    #[error("completion request rejected: {0}")]
    Permanent(String),
}

/// Failure surfaced by the scorer. Transient errors are retried by the processor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("transient scoring error: {0}")]
    Transient(String),
    #[error("permanent scoring error: {0}")]
    Permanent(String),
}

impl From<CompletionError> for ScoringError {
    fn from(value: CompletionError) -> Self {
        match value {
            CompletionError::Transient(detail) => Self::Transient(detail),
            CompletionError::Permanent(detail) => Self::Permanent(detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Score reported when the completion cannot be parsed.
    pub default_score: f32,
    pub max_description_chars: usize,
    /// Model self-reported confidence (0-100) below which the score is not trusted.
    pub min_model_confidence: Option<u8>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_score: 0.0,
            max_description_chars: 4000,
            min_model_confidence: None,
        }
    }
}

/// Normalized AI opinion on a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityAssessment {
    pub score: f32,
    pub rationale: String,
    /// False when no usable score could be extracted.
    pub confidence: bool,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub model_confidence: Option<u8>,
}

impl SuitabilityAssessment {
    pub fn summary(&self) -> String {
        if self.red_flags.is_empty() {
            self.rationale.clone()
        } else {
            format!("{} Red flags: {}.", self.rationale, self.red_flags.join("; "))
        }
    }
}

/// Adapter isolating the completion backend from the pipeline.
pub struct SuitabilityScorer<C: ?Sized> {
    client: Arc<C>,
    config: ScoringConfig,
}

impl<C> SuitabilityScorer<C>
where
    C: CompletionClient + ?Sized,
{
    pub fn new(client: Arc<C>, config: ScoringConfig) -> Self {
        Self { client, config }
    }

    /// Score an eligible lead. Disqualified leads short-circuit to `Ok(None)` without touching
    /// the completion backend.
    pub fn assess(
        &self,
        record: &LeadRecord,
        profile: &JurisdictionProfile,
        eligibility: &EligibilityOutcome,
        today: NaiveDate,
    ) -> Result<Option<SuitabilityAssessment>, ScoringError> {
        if eligibility.disqualified {
            return Ok(None);
        }

        let prompt = prompt::build_prompt(
            record,
            profile,
            eligibility,
            today,
            self.config.max_description_chars,
        );
        let raw = self.client.complete(&prompt)?;
        let assessment = parser::parse_assessment(&raw, &self.config);

        if !assessment.confidence {
            tracing::warn!(
                lead_id = %record.id,
                rationale = %assessment.rationale,
                "AI assessment unusable, routing to manual review"
            );
        }

        Ok(Some(assessment))
    }
}

mod config;
mod rules;

pub use config::EligibilityConfig;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::LeadRecord;
use super::jurisdiction::JurisdictionProfile;

/// Stateless evaluator applying the deterministic intake rules.
#[derive(Debug, Clone, Default)]
pub struct EligibilityEvaluator {
    config: EligibilityConfig,
}

impl EligibilityEvaluator {
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    /// Run every rule in order. The first failure supplies the disqualification reason; later
    /// rules still run so the outcome carries a complete audit trail.
    pub fn evaluate(
        &self,
        record: &LeadRecord,
        profile: &JurisdictionProfile,
        today: NaiveDate,
    ) -> EligibilityOutcome {
        let time_bar = rules::time_bar(record, profile, &self.config, today);
        let geography = rules::geography(record, profile, &self.config);
        let case_type = rules::case_type(record, &self.config);

        let checks = vec![time_bar, geography.check, case_type];
        let reason = checks
            .iter()
            .find(|check| !check.passed)
            .map(|check| check.detail.clone());

        EligibilityOutcome {
            disqualified: reason.is_some(),
            reason,
            checks,
            county: geography.county,
            preferred_county: geography.preferred,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityRule {
    TimeBar,
    Geography,
    CaseType,
}

/// Result of one rule, kept for auditability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCheck {
    pub rule: EligibilityRule,
    pub passed: bool,
    pub detail: String,
}

impl RuleCheck {
    pub(crate) fn pass(rule: EligibilityRule, detail: impl Into<String>) -> Self {
        Self {
            rule,
            passed: true,
            detail: detail.into(),
        }
    }

    pub(crate) fn fail(rule: EligibilityRule, detail: impl Into<String>) -> Self {
        Self {
            rule,
            passed: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityOutcome {
    pub checks: Vec<RuleCheck>,
    pub disqualified: bool,
    pub reason: Option<String>,
    pub county: Option<String>,
    pub preferred_county: bool,
}

impl EligibilityOutcome {
    pub fn check(&self, rule: EligibilityRule) -> Option<&RuleCheck> {
        self.checks.iter().find(|check| check.rule == rule)
    }

    pub fn passed(&self, rule: EligibilityRule) -> bool {
        self.check(rule).map(|check| check.passed).unwrap_or(false)
    }
}

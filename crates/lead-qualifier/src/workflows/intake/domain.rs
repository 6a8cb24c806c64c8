use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::repository::NotificationTemplate;

/// Identifier wrapper for intake records owned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl LeadId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One intake submission as read from the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: LeadId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub injury_date: Option<NaiveDate>,
    pub jurisdiction: String,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub accident_location: Option<String>,
    pub case_type: String,
    pub description: String,
    pub status: LeadStatus,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub qualification: Option<QualificationResult>,
}

impl LeadRecord {
    /// Whether the persisted result already confirms dispatched side effects.
    pub fn side_effects_applied(&self) -> bool {
        self.qualification
            .as_ref()
            .map(|result| result.side_effects_applied)
            .unwrap_or(false)
    }

    /// Mirror a persisted partial update onto the local copy.
    pub fn apply(&mut self, update: &LeadUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(last_error) = &update.last_error {
            self.last_error = last_error.clone();
        }
        if let Some(result) = &update.qualification {
            self.qualification = Some(result.clone());
        }
    }
}

/// Processing status tracked on every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    InProgress,
    Scored,
    Completed,
    Failed,
}

impl LeadStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "NEW",
            LeadStatus::InProgress => "IN_PROGRESS",
            LeadStatus::Scored => "SCORED",
            LeadStatus::Completed => "COMPLETED",
            LeadStatus::Failed => "FAILED",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "NEW" => Some(LeadStatus::New),
            "IN_PROGRESS" => Some(LeadStatus::InProgress),
            "SCORED" => Some(LeadStatus::Scored),
            "COMPLETED" => Some(LeadStatus::Completed),
            "FAILED" => Some(LeadStatus::Failed),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, LeadStatus::Completed | LeadStatus::Failed)
    }
}

/// Closed set of handling paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    #[serde(rename = "TIER_1_AUTO_ACCEPT")]
    AutoAccept,
    #[serde(rename = "TIER_2_REVIEW")]
    Review,
    #[serde(rename = "TIER_3_DECLINE")]
    Decline,
}

impl Tier {
    pub const fn label(self) -> &'static str {
        match self {
            Tier::AutoAccept => "TIER_1_AUTO_ACCEPT",
            Tier::Review => "TIER_2_REVIEW",
            Tier::Decline => "TIER_3_DECLINE",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "TIER_1_AUTO_ACCEPT" => Some(Tier::AutoAccept),
            "TIER_2_REVIEW" => Some(Tier::Review),
            "TIER_3_DECLINE" => Some(Tier::Decline),
            _ => None,
        }
    }
}

/// Which signal produced the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionBasis {
    Rule,
    AssessmentUnavailable,
    Score,
}

/// Persisted outcome of a qualification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationResult {
    pub tier: Tier,
    pub basis: DecisionBasis,
    pub reason: String,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub rationale: Option<String>,
    pub decided_at: DateTime<Utc>,
    #[serde(default)]
    pub case_id: Option<String>,
    /// Notifications already confirmed by the notifier, persisted after each send.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notified: Vec<NotificationTemplate>,
    #[serde(default)]
    pub side_effects_applied: bool,
}

/// Field-level partial update sent to the record store. `None` leaves a field untouched;
/// `last_error: Some(None)` clears the stored note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<QualificationResult>,
}

impl LeadUpdate {
    pub fn status(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.last_error = Some(Some(message.into()));
        self
    }

    pub fn clearing_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }

    pub fn with_qualification(mut self, result: QualificationResult) -> Self {
        self.qualification = Some(result);
        self
    }
}

/// Process-wide automation level, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Starter,
    Pro,
}

impl OperationMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "starter" => Some(Self::Starter),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }

    pub const fn dispatches_side_effects(self) -> bool {
        matches!(self, OperationMode::Pro)
    }

    pub const fn label(self) -> &'static str {
        match self {
            OperationMode::Starter => "starter",
            OperationMode::Pro => "pro",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip_through_store_spellings() {
        assert_eq!(LeadStatus::from_label("in progress"), Some(LeadStatus::InProgress));
        assert_eq!(LeadStatus::from_label("Scored"), Some(LeadStatus::Scored));
        assert_eq!(LeadStatus::from_label("archived"), None);
        assert!(LeadStatus::Failed.is_terminal());
        assert!(!LeadStatus::Scored.is_terminal());
    }

    #[test]
    fn tier_serializes_with_external_labels() {
        let value = serde_json::to_value(Tier::AutoAccept).expect("serializes");
        assert_eq!(value, serde_json::json!("TIER_1_AUTO_ACCEPT"));
        assert_eq!(Tier::from_label("TIER_3_DECLINE"), Some(Tier::Decline));
    }

    #[test]
    fn update_skips_untouched_fields() {
        let update = LeadUpdate::status(LeadStatus::Failed).with_error("timeout");
        let value = serde_json::to_value(&update).expect("serializes");
        assert_eq!(
            value,
            serde_json::json!({ "status": "FAILED", "last_error": "timeout" })
        );
    }

    #[test]
    fn operation_mode_parses_case_insensitively() {
        assert_eq!(OperationMode::parse(" PRO "), Some(OperationMode::Pro));
        assert_eq!(OperationMode::parse("enterprise"), None);
        assert!(!OperationMode::Starter.dispatches_side_effects());
    }
}

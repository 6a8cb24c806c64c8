use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{LeadId, LeadRecord, LeadUpdate};

/// Record store holding intake submissions. Implementations must apply updates field by field.
pub trait LeadStore: Send + Sync {
    /// Every non-terminal record, in store order.
    fn fetch_pending(&self) -> Result<Vec<LeadRecord>, StoreError>;
    fn update(&self, id: &LeadId, update: LeadUpdate) -> Result<(), StoreError>;
    fn fetch(&self, id: &LeadId) -> Result<Option<LeadRecord>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("record store rejected request: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Practice-management system that opens case files for accepted leads.
pub trait CaseManagement: Send + Sync {
    fn create_case(&self, record: &LeadRecord) -> Result<String, CaseError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaseError {
    #[error("case management unavailable: {0}")]
    Unavailable(String),
    #[error("case management rejected request: {0}")]
    Rejected(String),
}

/// Outbound notification channel (intake team e-mail, referral notices).
pub trait Notifier: Send + Sync {
    fn send(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub template: NotificationTemplate,
    pub lead_id: LeadId,
    pub context: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    AutoAccepted,
    ReviewRequested,
    Declined,
    LeadReferral,
    ProcessingFailed,
}

impl NotificationTemplate {
    pub const fn subject(self) -> &'static str {
        match self {
            NotificationTemplate::AutoAccepted => "New case accepted",
            NotificationTemplate::ReviewRequested => "Lead requires review",
            NotificationTemplate::Declined => "Lead declined",
            NotificationTemplate::LeadReferral => "Regarding your inquiry",
            NotificationTemplate::ProcessingFailed => "Lead processing failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

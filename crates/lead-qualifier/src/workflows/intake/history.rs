use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{LeadId, LeadStatus, Tier};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One processed record as shown on the status API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub lead_id: LeadId,
    pub name: String,
    pub status: LeadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryStats {
    pub processed: usize,
    pub auto_accepted: usize,
    pub review: usize,
    pub declined: usize,
    pub failed: usize,
    pub average_score: Option<f32>,
}

/// Bounded, newest-first log of processing outcomes shared with the status server.
#[derive(Debug)]
pub struct ProcessingHistory {
    capacity: usize,
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl ProcessingHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().take(limit).cloned().collect()
    }

    pub fn stats(&self) -> HistoryStats {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stats = HistoryStats {
            processed: entries.len(),
            ..HistoryStats::default()
        };

        let mut score_total = 0.0_f32;
        let mut scored = 0_usize;
        for entry in entries.iter() {
            if entry.status == LeadStatus::Failed {
                stats.failed += 1;
                continue;
            }
            match entry.tier {
                Some(Tier::AutoAccept) => stats.auto_accepted += 1,
                Some(Tier::Review) => stats.review += 1,
                Some(Tier::Decline) => stats.declined += 1,
                None => {}
            }
            if let Some(score) = entry.score {
                score_total += score;
                scored += 1;
            }
        }
        if scored > 0 {
            stats.average_score = Some(score_total / scored as f32);
        }
        stats
    }
}

impl Default for ProcessingHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

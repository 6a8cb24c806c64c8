use serde::{Deserialize, Serialize};

/// Practice-specific dials for the deterministic eligibility rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityConfig {
    /// County or metro-group names that override the jurisdiction's default preferred set.
    /// Empty means "use the jurisdiction defaults".
    #[serde(default)]
    pub preferred_counties: Vec<String>,
    #[serde(default)]
    pub excluded_case_types: Vec<String>,
    /// Leads whose limitation window closes within this many months are treated as time-barred.
    #[serde(default)]
    pub min_sol_months_remaining: u32,
}

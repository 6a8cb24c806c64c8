use serde::{Deserialize, Serialize};

use super::super::domain::Tier;

/// Ordered score cut points. Construction enforces `0 <= review <= accept <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringThresholds {
    review: f32,
    accept: f32,
}

impl ScoringThresholds {
    pub const DEFAULT_REVIEW: f32 = 40.0;
    pub const DEFAULT_ACCEPT: f32 = 75.0;

    pub fn new(review: f32, accept: f32) -> Result<Self, ThresholdError> {
        if !review.is_finite() || !accept.is_finite() {
            return Err(ThresholdError::NotFinite);
        }
        if !(0.0..=100.0).contains(&review) || !(0.0..=100.0).contains(&accept) {
            return Err(ThresholdError::OutOfRange { review, accept });
        }
        if review > accept {
            return Err(ThresholdError::Inverted { review, accept });
        }
        Ok(Self { review, accept })
    }

    pub fn review(&self) -> f32 {
        self.review
    }

    pub fn accept(&self) -> f32 {
        self.accept
    }

    /// A score sitting exactly on a cut point lands in the lower tier.
    pub fn tier_for(&self, score: f32) -> Tier {
        if score > self.accept {
            Tier::AutoAccept
        } else if score > self.review {
            Tier::Review
        } else {
            Tier::Decline
        }
    }
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            review: Self::DEFAULT_REVIEW,
            accept: Self::DEFAULT_ACCEPT,
        }
    }
}

impl<'de> Deserialize<'de> for ScoringThresholds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            review: f32,
            accept: f32,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.review, raw.accept).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("thresholds must be finite numbers")]
    NotFinite,
    #[error("thresholds must lie within 0..=100 (review {review}, accept {accept})")]
    OutOfRange { review: f32, accept: f32 },
    #[error("review threshold {review} exceeds accept threshold {accept}")]
    Inverted { review: f32, accept: f32 },
}

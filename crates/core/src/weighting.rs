use thiserror::Error;

use crate::model::OutcomeRecord;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum WeightPolicyError {
    #[error("weight floor must be in (0, 1], got {provided}")]
    InvalidFloor { provided: f64 },
    #[error("missed-question weight must be finite and >= 1, got {provided}")]
    InvalidMissed { provided: f64 },
    #[error("unseen-question weight must be finite and > 0, got {provided}")]
    InvalidUnseen { provided: f64 },
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Maps a question's history to a selection weight.
///
/// - never attempted: `unseen`
/// - last answer wrong: `missed`
/// - otherwise: `max(floor, 1 / (1 + streak))`
///
/// Because `missed >= 1` and the streak term never exceeds `1 / 2`, a question
/// whose latest answer was wrong always outweighs one answered correctly, and
/// `floor > 0` keeps every question reachable.
///
/// # Examples
///
/// ```
/// # use quiz_core::WeightPolicy;
/// let policy = WeightPolicy::default();
/// assert_eq!(policy.weight(None), 3.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightPolicy {
    unseen: f64,
    missed: f64,
    floor: f64,
}

impl Default for WeightPolicy {
    fn default() -> Self {
        Self {
            unseen: 3.0,
            missed: 2.0,
            floor: 0.1,
        }
    }
}

impl WeightPolicy {
    /// Create a policy with custom weights.
    ///
    /// # Errors
    ///
    /// Returns `WeightPolicyError` when any weight is out of its allowed range.
    pub fn new(unseen: f64, missed: f64, floor: f64) -> Result<Self, WeightPolicyError> {
        if !floor.is_finite() || floor <= 0.0 || floor > 1.0 {
            return Err(WeightPolicyError::InvalidFloor { provided: floor });
        }
        if !missed.is_finite() || missed < 1.0 {
            return Err(WeightPolicyError::InvalidMissed { provided: missed });
        }
        if !unseen.is_finite() || unseen <= 0.0 {
            return Err(WeightPolicyError::InvalidUnseen { provided: unseen });
        }
        Ok(Self {
            unseen,
            missed,
            floor,
        })
    }

    /// Default weights with a custom floor.
    ///
    /// # Errors
    ///
    /// Returns `WeightPolicyError::InvalidFloor` if `floor` is not in `(0, 1]`.
    pub fn with_floor(floor: f64) -> Result<Self, WeightPolicyError> {
        let base = Self::default();
        Self::new(base.unseen, base.missed, floor)
    }

    #[must_use]
    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Selection weight for a question with the given history.
    #[must_use]
    pub fn weight(&self, record: Option<&OutcomeRecord>) -> f64 {
        match record {
            None => self.unseen,
            Some(rec) if !rec.last_result() => self.missed,
            Some(rec) => {
                let decay = 1.0 / (1.0 + f64::from(rec.streak()));
                decay.max(self.floor)
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

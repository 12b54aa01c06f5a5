use thiserror::Error;

use crate::weighting::{WeightPolicy, WeightPolicyError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("session length must be > 0")]
    InvalidSessionLength,

    #[error("pass percentage must be between 1 and 100, got {0}")]
    InvalidPassPercentage(u8),

    #[error(transparent)]
    Weight(#[from] WeightPolicyError),
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// When answered questions are written to durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Save after every answer; a crash loses nothing that was answered.
    #[default]
    EveryAnswer,
    /// Save once when the session completes (or on explicit save).
    SessionEnd,
}

/// Tunables for a quiz run, supplied by whoever hosts the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSettings {
    session_length: Option<u32>,
    weights: WeightPolicy,
    seed: Option<u64>,
    pass_percentage: u8,
    shuffle_options: bool,
    flush: FlushPolicy,
}

impl Default for QuizSettings {
    /// Whole-bank sessions, 80% to pass, shuffled options, flush on every answer.
    fn default() -> Self {
        Self {
            session_length: None,
            weights: WeightPolicy::default(),
            seed: None,
            pass_percentage: 80,
            shuffle_options: true,
            flush: FlushPolicy::EveryAnswer,
        }
    }
}

impl QuizSettings {
    /// Creates custom settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the session length is zero, the pass percentage
    /// is outside `1..=100`, or the weight floor is not in `(0, 1]`.
    pub fn new(
        session_length: Option<u32>,
        min_weight: f64,
        seed: Option<u64>,
        pass_percentage: u8,
        shuffle_options: bool,
        flush: FlushPolicy,
    ) -> Result<Self, SettingsError> {
        if session_length == Some(0) {
            return Err(SettingsError::InvalidSessionLength);
        }
        if !(1..=100).contains(&pass_percentage) {
            return Err(SettingsError::InvalidPassPercentage(pass_percentage));
        }
        Ok(Self {
            session_length,
            weights: WeightPolicy::with_floor(min_weight)?,
            seed,
            pass_percentage,
            shuffle_options,
            flush,
        })
    }

    /// Maximum questions per session; `None` runs through the whole pool.
    #[must_use]
    pub fn session_length(&self) -> Option<u32> {
        self.session_length
    }

    #[must_use]
    pub fn weights(&self) -> &WeightPolicy {
        &self.weights
    }

    #[must_use]
    pub fn min_weight(&self) -> f64 {
        self.weights.floor()
    }

    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    #[must_use]
    pub fn pass_percentage(&self) -> u8 {
        self.pass_percentage
    }

    #[must_use]
    pub fn shuffle_options(&self) -> bool {
        self.shuffle_options
    }

    #[must_use]
    pub fn flush(&self) -> FlushPolicy {
        self.flush
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_shuffle_options(mut self, shuffle: bool) -> Self {
        self.shuffle_options = shuffle;
        self
    }

    /// Override the session length.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidSessionLength` for `Some(0)`.
    pub fn with_session_length(mut self, length: Option<u32>) -> Result<Self, SettingsError> {
        if length == Some(0) {
            return Err(SettingsError::InvalidSessionLength);
        }
        self.session_length = length;
        Ok(self)
    }

    #[must_use]
    pub fn with_flush(mut self, flush: FlushPolicy) -> Self {
        self.flush = flush;
        self
    }
}

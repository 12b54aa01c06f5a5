use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutcomeError {
    #[error("correct count ({correct}) exceeds attempts ({attempts})")]
    CorrectExceedsAttempts { attempts: u32, correct: u32 },

    #[error("streak ({streak}) exceeds correct count ({correct})")]
    StreakExceedsCorrect { correct: u32, streak: u32 },

    #[error("a stored outcome must have at least one attempt")]
    NoAttempts,

    #[error("last result is correct but the streak is zero")]
    StreakMismatch,
}

/// Historical answers for a single question.
///
/// Invariant: `attempts >= correct >= streak`, and `streak > 0` exactly when
/// `last_result` is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    attempts: u32,
    correct: u32,
    streak: u32,
    last_result: bool,
    last_seen: DateTime<Utc>,
}

impl OutcomeRecord {
    /// Record for a question answered for the first time.
    #[must_use]
    pub fn first(was_correct: bool, at: DateTime<Utc>) -> Self {
        Self {
            attempts: 1,
            correct: u32::from(was_correct),
            streak: u32::from(was_correct),
            last_result: was_correct,
            last_seen: at,
        }
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `OutcomeError` if the counters violate the record invariants.
    pub fn from_persisted(
        attempts: u32,
        correct: u32,
        streak: u32,
        last_result: bool,
        last_seen: DateTime<Utc>,
    ) -> Result<Self, OutcomeError> {
        if attempts == 0 {
            return Err(OutcomeError::NoAttempts);
        }
        if correct > attempts {
            return Err(OutcomeError::CorrectExceedsAttempts { attempts, correct });
        }
        if streak > correct {
            return Err(OutcomeError::StreakExceedsCorrect { correct, streak });
        }
        if last_result != (streak > 0) {
            return Err(OutcomeError::StreakMismatch);
        }
        Ok(Self {
            attempts,
            correct,
            streak,
            last_result,
            last_seen,
        })
    }

    /// Fold one more answer into the record.
    pub fn record(&mut self, was_correct: bool, at: DateTime<Utc>) {
        self.attempts = self.attempts.saturating_add(1);
        if was_correct {
            self.correct = self.correct.saturating_add(1);
            self.streak = self.streak.saturating_add(1);
        } else {
            self.streak = 0;
        }
        self.last_result = was_correct;
        self.last_seen = at;
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    /// Consecutive correct answers ending with the latest one.
    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn last_result(&self) -> bool {
        self.last_result
    }

    #[must_use]
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }
}

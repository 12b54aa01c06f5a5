use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("correct answers ({correct}) exceed questions asked ({asked})")]
    CountMismatch { asked: u32, correct: u32 },

    #[error("unknown session mode: {0}")]
    UnknownMode(String),
}

/// Which pool of questions a session draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Every question in the bank.
    #[default]
    Full,
    /// Only questions the user bookmarked.
    Bookmarked,
    /// Only questions whose latest answer was wrong.
    Missed,
}

impl SessionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Bookmarked => "bookmarked",
            Self::Missed => "missed",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionMode {
    type Err = SessionSummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "bookmarked" => Ok(Self::Bookmarked),
            "missed" => Ok(Self::Missed),
            other => Err(SessionSummaryError::UnknownMode(other.to_owned())),
        }
    }
}

/// Score of one finished quiz session, kept in the progress history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    mode: SessionMode,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_asked: u32,
    total_correct: u32,
}

impl SessionSummary {
    /// Build or rehydrate a summary.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is before
    /// `started_at`, and `SessionSummaryError::CountMismatch` if more answers were
    /// correct than were asked.
    pub fn new(
        mode: SessionMode,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_asked: u32,
        total_correct: u32,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        if total_correct > total_asked {
            return Err(SessionSummaryError::CountMismatch {
                asked: total_asked,
                correct: total_correct,
            });
        }
        Ok(Self {
            mode,
            started_at,
            completed_at,
            total_asked,
            total_correct,
        })
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_asked(&self) -> u32 {
        self.total_asked
    }

    #[must_use]
    pub fn total_correct(&self) -> u32 {
        self.total_correct
    }

    /// Fraction of correct answers in `[0, 1]`; zero when nothing was asked.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        accuracy(self.total_correct, self.total_asked)
    }

    /// Whether the accuracy reaches `pass_percentage` percent.
    #[must_use]
    pub fn passed(&self, pass_percentage: u8) -> bool {
        passes(self.total_correct, self.total_asked, pass_percentage)
    }
}

/// Ratio of `correct` to `asked`, or zero when nothing was asked.
#[must_use]
pub fn accuracy(correct: u32, asked: u32) -> f64 {
    if asked == 0 {
        0.0
    } else {
        f64::from(correct) / f64::from(asked)
    }
}

/// Integer pass check: `correct * 100 >= asked * pass_percentage`.
#[must_use]
pub fn passes(correct: u32, asked: u32, pass_percentage: u8) -> bool {
    asked > 0 && u64::from(correct) * 100 >= u64::from(asked) * u64::from(pass_percentage)
}

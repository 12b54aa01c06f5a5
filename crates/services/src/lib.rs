#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::{SelectError, SessionError};

pub use sessions::{
    AdaptiveSelector, AnswerFeedback, HistoryItem, MissedQuestion, PresentedQuestion,
    ProgressOverview, QuizAnswerResult, QuizLoopService, QuizSession, SessionProgress,
    SessionReport, SessionState,
};

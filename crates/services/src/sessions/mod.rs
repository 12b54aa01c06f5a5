mod progress;
mod selector;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{SelectError, SessionError};
pub use progress::SessionProgress;
pub use selector::AdaptiveSelector;
pub use service::{
    AnswerFeedback, MissedQuestion, PresentedQuestion, QuizSession, SessionReport, SessionState,
};
pub use view::{HistoryItem, ProgressOverview};
pub use workflow::{QuizAnswerResult, QuizLoopService};

mod bank;
mod ids;
mod outcome;
mod progress;
mod question;
mod session;
mod settings;

pub use ids::{ParseIdError, QuestionId};

pub use bank::{BankModelError, QuestionBank};
pub use outcome::{OutcomeError, OutcomeRecord};
pub use progress::ProgressStore;
pub use question::{Category, Question, QuestionDraft, QuestionError, Topic};
pub use session::{SessionMode, SessionSummary, SessionSummaryError, accuracy, passes};
pub use settings::{FlushPolicy, QuizSettings, SettingsError};

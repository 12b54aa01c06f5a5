use std::sync::Arc;
use tracing::{info, warn};

use quiz_core::model::{FlushPolicy, ProgressStore, QuestionBank, QuestionId, QuizSettings, SessionMode};
use storage::{ProgressRepository, RecoverableWarning};

use super::service::{AnswerFeedback, QuizSession, SessionReport};
use super::view::ProgressOverview;
use crate::Clock;
use crate::error::SessionError;

/// Result of answering the current question in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizAnswerResult {
    pub feedback: AnswerFeedback,
    /// Whether progress was written to the repository after this answer.
    pub persisted: bool,
    /// Present once the session has completed.
    pub report: Option<SessionReport>,
}

/// Orchestrates sessions against the single progress store of a profile.
///
/// This service owns:
/// - the time source (`Clock`)
/// - the loaded `ProgressStore`
/// - repository access and the flush policy
///
/// Sessions borrow the store through this service; they never hold a copy.
pub struct QuizLoopService {
    clock: Clock,
    bank: Arc<QuestionBank>,
    settings: QuizSettings,
    repository: Arc<dyn ProgressRepository>,
    progress: ProgressStore,
    load_warning: Option<RecoverableWarning>,
}

impl QuizLoopService {
    /// Load progress from `repository` and prepare to run sessions over `bank`.
    ///
    /// Unreadable progress is not an error: the service starts from an empty
    /// store and the notice is available from [`Self::load_warning`].
    #[must_use]
    pub fn open(
        clock: Clock,
        bank: Arc<QuestionBank>,
        settings: QuizSettings,
        repository: Arc<dyn ProgressRepository>,
    ) -> Self {
        let loaded = repository.load();
        if let Some(warning) = &loaded.warning {
            warn!(reason = %warning.reason, "progress reset");
        }
        info!(
            questions = bank.len(),
            attempted = loaded.store.attempted_count(&bank),
            "quiz service opened"
        );
        Self {
            clock,
            bank,
            settings,
            repository,
            progress: loaded.store,
            load_warning: loaded.warning,
        }
    }

    #[must_use]
    pub fn load_warning(&self) -> Option<&RecoverableWarning> {
        self.load_warning.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    /// Start a session in `mode` and draw its first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when the mode has nothing to ask.
    pub fn start_session(&self, mode: SessionMode) -> Result<QuizSession, SessionError> {
        let mut session = QuizSession::new(Arc::clone(&self.bank), self.settings.clone(), mode);
        session.start(&self.progress, self.clock.now())?;
        Ok(session)
    }

    /// Answer the session's current question and flush per the flush policy.
    ///
    /// On completion the session summary is appended to history and progress is
    /// saved regardless of policy. Write failures are logged and reported through
    /// `persisted`; they never abort the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for invalid input or a session not in progress.
    /// Progress is untouched in that case. Once an answer is recorded the call
    /// succeeds; a summary that cannot be built is logged and skipped.
    pub fn answer_current(
        &mut self,
        session: &mut QuizSession,
        selected: usize,
    ) -> Result<QuizAnswerResult, SessionError> {
        let now = self.clock.now();
        let feedback = session.answer(&mut self.progress, selected, now)?;

        if feedback.is_complete {
            match session.build_summary() {
                Ok(summary) => self.progress.push_summary(summary),
                Err(e) => warn!(error = %e, "session summary not recorded"),
            }
            let report = session.summary()?;
            let persisted = self.flush();
            return Ok(QuizAnswerResult {
                feedback,
                persisted,
                report: Some(report),
            });
        }

        let persisted = match self.settings.flush() {
            FlushPolicy::EveryAnswer => self.flush(),
            FlushPolicy::SessionEnd => false,
        };
        Ok(QuizAnswerResult {
            feedback,
            persisted,
            report: None,
        })
    }

    /// Flip the bookmark on a bank question and save.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownQuestion` for ids outside the bank, and
    /// `SessionError::Storage` if the save fails (the toggle is kept in memory).
    pub fn toggle_bookmark(&mut self, question_id: QuestionId) -> Result<bool, SessionError> {
        if !self.bank.contains(question_id) {
            return Err(SessionError::UnknownQuestion(question_id));
        }
        let bookmarked = self.progress.toggle_bookmark(question_id);
        self.repository.save(&self.progress)?;
        Ok(bookmarked)
    }

    /// Save progress now.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the repository write fails.
    pub fn save(&self) -> Result<(), SessionError> {
        self.repository.save(&self.progress)?;
        Ok(())
    }

    #[must_use]
    pub fn overview(&self) -> ProgressOverview {
        ProgressOverview::build(&self.bank, &self.progress, self.settings.pass_percentage())
    }

    fn flush(&self) -> bool {
        match self.repository.save(&self.progress) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to save progress");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionDraft;
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::InMemoryProgressRepository;

    fn bank(n: usize) -> Arc<QuestionBank> {
        let questions = (0..n)
            .map(|i| {
                QuestionDraft {
                    prompt: format!("Sign number {i}?"),
                    options: vec!["stop".into(), "go".into(), "wait".into()],
                    correct: 0,
                    explanation: String::new(),
                    category: None,
                }
                .validate(0)
                .unwrap()
            })
            .collect();
        Arc::new(QuestionBank::new(questions).unwrap())
    }

    fn settings(flush: FlushPolicy) -> QuizSettings {
        QuizSettings::new(None, 0.1, Some(5), 80, false, flush).unwrap()
    }

    #[test]
    fn every_answer_policy_saves_each_answer() {
        let repo = Arc::new(InMemoryProgressRepository::new());
        let mut svc = QuizLoopService::open(
            fixed_clock(),
            bank(3),
            settings(FlushPolicy::EveryAnswer),
            repo.clone(),
        );
        let mut session = svc.start_session(SessionMode::Full).unwrap();

        let first = svc.answer_current(&mut session, 0).unwrap();
        assert!(first.persisted);
        assert!(first.report.is_none());
        assert_eq!(repo.save_count(), 1);
        assert_eq!(repo.saved().unwrap().attempted_count(svc.bank()), 1);
    }

    #[test]
    fn session_end_policy_saves_once_with_history() {
        let repo = Arc::new(InMemoryProgressRepository::new());
        let mut svc = QuizLoopService::open(
            fixed_clock(),
            bank(2),
            settings(FlushPolicy::SessionEnd),
            repo.clone(),
        );
        let mut session = svc.start_session(SessionMode::Full).unwrap();

        let first = svc.answer_current(&mut session, 0).unwrap();
        assert!(!first.persisted);
        assert_eq!(repo.save_count(), 0);

        let last = svc.answer_current(&mut session, 1).unwrap();
        let report = last.report.unwrap();
        assert!(last.persisted);
        assert_eq!(report.total_asked, 2);
        assert_eq!(report.total_correct, 1);
        assert_eq!(repo.save_count(), 1);
        assert_eq!(repo.saved().unwrap().history().len(), 1);
    }

    #[test]
    fn failed_save_is_reported_not_fatal() {
        let repo = Arc::new(InMemoryProgressRepository::failing());
        let mut svc = QuizLoopService::open(
            fixed_clock(),
            bank(2),
            settings(FlushPolicy::EveryAnswer),
            repo,
        );
        let mut session = svc.start_session(SessionMode::Full).unwrap();

        let result = svc.answer_current(&mut session, 0).unwrap();
        assert!(!result.persisted);
        assert_eq!(svc.progress().attempted_count(svc.bank()), 1);
    }

    #[test]
    fn invalid_answer_leaves_progress_untouched() {
        let repo = Arc::new(InMemoryProgressRepository::new());
        let mut svc = QuizLoopService::open(
            fixed_clock(),
            bank(2),
            settings(FlushPolicy::EveryAnswer),
            repo.clone(),
        );
        let mut session = svc.start_session(SessionMode::Full).unwrap();

        let err = svc.answer_current(&mut session, 9).unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput { .. }));
        assert!(svc.progress().is_empty());
        assert_eq!(repo.save_count(), 0);
    }

    #[test]
    fn bookmarks_persist_and_feed_bookmarked_mode() {
        let repo = Arc::new(InMemoryProgressRepository::new());
        let mut svc = QuizLoopService::open(
            fixed_clock(),
            bank(4),
            settings(FlushPolicy::EveryAnswer),
            repo.clone(),
        );
        let target = svc.bank().ids().nth(2).unwrap();

        assert!(svc.toggle_bookmark(target).unwrap());
        assert!(repo.saved().unwrap().is_bookmarked(target));
        assert!(matches!(
            svc.toggle_bookmark(QuestionId::new(1)),
            Err(SessionError::UnknownQuestion(_))
        ));

        let session = svc.start_session(SessionMode::Bookmarked).unwrap();
        assert_eq!(session.current().unwrap().id, target);
        assert_eq!(svc.overview().bookmarked, 1);
    }

    #[test]
    fn clock_stepping_back_still_completes_and_saves() {
        let repo = Arc::new(InMemoryProgressRepository::new());
        let mut svc = QuizLoopService::open(
            fixed_clock(),
            bank(1),
            settings(FlushPolicy::SessionEnd),
            repo.clone(),
        );
        let mut session = QuizSession::new(
            Arc::clone(&svc.bank),
            svc.settings().clone(),
            SessionMode::Full,
        );
        session
            .start(svc.progress(), fixed_now() + chrono::Duration::seconds(1))
            .unwrap();

        let result = svc.answer_current(&mut session, 0).unwrap();
        assert!(result.persisted);
        assert_eq!(result.report.unwrap().total_asked, 1);
        assert_eq!(repo.save_count(), 1);
        assert_eq!(repo.saved().unwrap().history().len(), 1);
    }

    #[test]
    fn reopening_restores_saved_progress() {
        let repo = Arc::new(InMemoryProgressRepository::new());
        let bank = bank(2);
        {
            let mut svc = QuizLoopService::open(
                fixed_clock(),
                Arc::clone(&bank),
                settings(FlushPolicy::EveryAnswer),
                repo.clone(),
            );
            let mut session = svc.start_session(SessionMode::Full).unwrap();
            svc.answer_current(&mut session, 1).unwrap();
        }

        let svc = QuizLoopService::open(
            fixed_clock(),
            bank,
            settings(FlushPolicy::EveryAnswer),
            repo,
        );
        assert!(svc.load_warning().is_none());
        assert_eq!(svc.overview().missed, 1);
    }
}

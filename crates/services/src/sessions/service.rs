use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use quiz_core::model::{
    Category, ProgressStore, Question, QuestionBank, QuestionId, QuizSettings, SessionMode,
    SessionSummary, Topic, accuracy, passes,
};
use quiz_core::time::elapsed_secs;

use super::progress::SessionProgress;
use super::selector::AdaptiveSelector;
use crate::error::{SelectError, SessionError};

//
// ─── PRESENTATION TYPES ────────────────────────────────────────────────────────
//

/// Lifecycle of a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress,
    Completed,
}

/// The question currently on screen, with options in presentation order.
///
/// Answer indices passed back to the session refer to `options` as listed
/// here, which may be shuffled relative to the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedQuestion {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub category: Category,
    pub topic: Topic,
    /// 1-based position within the session.
    pub number: usize,
    /// Questions planned for the session.
    pub planned: usize,
}

/// Immediate result of answering one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub was_correct: bool,
    pub selected_option: String,
    pub correct_option: String,
    pub explanation: String,
    pub is_complete: bool,
}

/// A question answered wrongly during the session, for end-of-quiz review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissedQuestion {
    pub question_id: QuestionId,
    pub prompt: String,
    pub selected_option: String,
    pub correct_option: String,
    pub explanation: String,
    pub topic: Topic,
}

/// Final score of a completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub mode: SessionMode,
    pub total_asked: u32,
    pub total_correct: u32,
    pub accuracy: f64,
    pub passed: bool,
    pub duration_secs: u64,
    pub missed: Vec<MissedQuestion>,
}

struct Current {
    presented: PresentedQuestion,
    /// `order[i]` is the bank option index shown at position `i`.
    order: Vec<usize>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz run: `NotStarted -> InProgress -> Completed`.
///
/// The session never owns the progress store. Callers pass it in for every
/// draw and answer, so there is exactly one store per profile and the session
/// only keeps what is local to this run.
pub struct QuizSession {
    bank: Arc<QuestionBank>,
    settings: QuizSettings,
    selector: AdaptiveSelector,
    rng: StdRng,
    mode: SessionMode,
    state: SessionState,
    excluded: HashSet<QuestionId>,
    asked: Vec<QuestionId>,
    current: Option<Current>,
    planned: usize,
    score: u32,
    missed: Vec<MissedQuestion>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Create a session over `bank`. The RNG is seeded from settings when a seed
    /// is configured, otherwise from the operating system.
    #[must_use]
    pub fn new(bank: Arc<QuestionBank>, settings: QuizSettings, mode: SessionMode) -> Self {
        let rng = match settings.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            selector: AdaptiveSelector::new(*settings.weights()),
            bank,
            settings,
            rng,
            mode,
            state: SessionState::NotStarted,
            excluded: HashSet::new(),
            asked: Vec::new(),
            current: None,
            planned: 0,
            score: 0,
            missed: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Questions asked so far, in order.
    #[must_use]
    pub fn asked(&self) -> &[QuestionId] {
        &self.asked
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn current(&self) -> Option<&PresentedQuestion> {
        self.current.as_ref().map(|c| &c.presented)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self.asked.len();
        SessionProgress {
            planned: self.planned,
            answered,
            correct: self.score,
            remaining: self.planned.saturating_sub(answered),
            is_complete: self.is_complete(),
        }
    }

    /// Begin the session and draw the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` if called twice, and
    /// `SessionError::Empty` when the mode's pool has no questions (the session
    /// then stays `NotStarted`).
    pub fn start(
        &mut self,
        progress: &ProgressStore,
        at: DateTime<Utc>,
    ) -> Result<&PresentedQuestion, SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }

        let pool: HashSet<QuestionId> = match self.mode {
            SessionMode::Full => self.bank.ids().collect(),
            SessionMode::Bookmarked => progress.bookmarked_ids(&self.bank).into_iter().collect(),
            SessionMode::Missed => progress.missed_ids(&self.bank).into_iter().collect(),
        };
        if pool.is_empty() {
            return Err(SessionError::Empty);
        }

        let limit = self
            .settings
            .session_length()
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
        self.planned = pool.len().min(limit);
        self.excluded = self.bank.ids().filter(|id| !pool.contains(id)).collect();
        self.asked.clear();
        self.missed.clear();
        self.score = 0;
        self.started_at = Some(at);
        self.state = SessionState::InProgress;

        info!(mode = %self.mode, planned = self.planned, "session started");
        self.draw(progress)?;
        self.current().ok_or(SessionError::Empty)
    }

    fn draw(&mut self, progress: &ProgressStore) -> Result<(), SelectError> {
        let question = self
            .selector
            .next(&self.bank, progress, &self.excluded, &mut self.rng)?;

        let mut order: Vec<usize> = (0..question.options().len()).collect();
        if self.settings.shuffle_options() {
            order.shuffle(&mut self.rng);
        }
        let presented = PresentedQuestion {
            id: question.id(),
            prompt: question.prompt().to_owned(),
            options: order.iter().map(|&i| question.options()[i].clone()).collect(),
            category: question.category(),
            topic: question.topic(),
            number: self.asked.len() + 1,
            planned: self.planned,
        };
        self.current = Some(Current { presented, order });
        Ok(())
    }

    fn current_question(&self) -> Result<(&Question, &Current), SessionError> {
        let current = self.current.as_ref().ok_or(SessionError::Completed)?;
        let question = self
            .bank
            .get(current.presented.id)
            .ok_or(SessionError::UnknownQuestion(current.presented.id))?;
        Ok((question, current))
    }

    /// Answer the current question with a zero-based index into its presented options.
    ///
    /// On success the outcome is recorded in `progress`, and the session either
    /// draws the next question or completes when the pool is used up or the
    /// configured length is reached.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for an out-of-range index, leaving the
    /// session, score and progress untouched. Returns `NotStarted`/`Completed`
    /// outside the `InProgress` state.
    pub fn answer(
        &mut self,
        progress: &mut ProgressStore,
        selected: usize,
        at: DateTime<Utc>,
    ) -> Result<AnswerFeedback, SessionError> {
        match self.state {
            SessionState::NotStarted => return Err(SessionError::NotStarted),
            SessionState::Completed => return Err(SessionError::Completed),
            SessionState::InProgress => {}
        }

        let (question, current) = self.current_question()?;
        let Some(&bank_index) = current.order.get(selected) else {
            return Err(SessionError::InvalidInput {
                selected,
                options: current.order.len(),
            });
        };

        let id = question.id();
        let was_correct = question.is_correct(bank_index);
        let selected_option = question.options()[bank_index].clone();
        let correct_option = question.correct_option().to_owned();
        let explanation = question.explanation().to_owned();
        let missed = (!was_correct).then(|| MissedQuestion {
            question_id: id,
            prompt: question.prompt().to_owned(),
            selected_option: selected_option.clone(),
            correct_option: correct_option.clone(),
            explanation: explanation.clone(),
            topic: question.topic(),
        });

        progress.record(id, was_correct, at);
        if was_correct {
            self.score += 1;
        }
        self.missed.extend(missed);
        self.excluded.insert(id);
        self.asked.push(id);
        self.current = None;

        let reached_limit = self.asked.len() >= self.planned;
        let exhausted = reached_limit || self.draw(progress).is_err();
        if exhausted {
            self.complete(at);
        }

        Ok(AnswerFeedback {
            question_id: id,
            was_correct,
            selected_option,
            correct_option,
            explanation,
            is_complete: self.is_complete(),
        })
    }

    fn complete(&mut self, at: DateTime<Utc>) {
        self.state = SessionState::Completed;
        self.current = None;
        // A wall clock can step backwards mid-session.
        self.completed_at = Some(self.started_at.map_or(at, |start| at.max(start)));
        info!(
            mode = %self.mode,
            asked = self.asked.len(),
            correct = self.score,
            "session completed"
        );
    }

    fn total_asked(&self) -> u32 {
        u32::try_from(self.asked.len()).unwrap_or(u32::MAX)
    }

    /// Score of the finished session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` unless the session is `Completed`.
    pub fn summary(&self) -> Result<SessionReport, SessionError> {
        if !self.is_complete() {
            return Err(SessionError::NotCompleted);
        }
        let total_asked = self.total_asked();
        let duration_secs = match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => elapsed_secs(start, end),
            _ => 0,
        };
        Ok(SessionReport {
            mode: self.mode,
            total_asked,
            total_correct: self.score,
            accuracy: accuracy(self.score, total_asked),
            passed: passes(self.score, total_asked, self.settings.pass_percentage()),
            duration_secs,
            missed: self.missed.clone(),
        })
    }

    /// History entry for the finished session.
    pub(crate) fn build_summary(&self) -> Result<SessionSummary, SessionError> {
        let (Some(started_at), Some(completed_at)) = (self.started_at, self.completed_at) else {
            return Err(SessionError::NotCompleted);
        };
        Ok(SessionSummary::new(
            self.mode,
            started_at,
            completed_at,
            self.total_asked(),
            self.score,
        )?)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("bank_len", &self.bank.len())
            .field("asked_len", &self.asked.len())
            .field("planned", &self.planned)
            .field("score", &self.score)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{FlushPolicy, QuestionDraft};
    use quiz_core::time::fixed_now;

    fn bank(n: usize) -> Arc<QuestionBank> {
        let questions = (0..n)
            .map(|i| {
                QuestionDraft {
                    prompt: format!("Question {i}?"),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct: 0,
                    explanation: format!("Because {i}."),
                    category: None,
                }
                .validate(0)
                .unwrap()
            })
            .collect();
        Arc::new(QuestionBank::new(questions).unwrap())
    }

    fn settings(length: Option<u32>) -> QuizSettings {
        QuizSettings::new(length, 0.1, Some(11), 80, false, FlushPolicy::EveryAnswer).unwrap()
    }

    #[test]
    fn answer_before_start_is_rejected() {
        let mut session = QuizSession::new(bank(2), settings(None), SessionMode::Full);
        let mut progress = ProgressStore::new();
        let err = session.answer(&mut progress, 0, fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::NotStarted));
        assert_eq!(session.state(), SessionState::NotStarted);
    }

    #[test]
    fn out_of_range_answer_changes_nothing() {
        let mut session = QuizSession::new(bank(3), settings(None), SessionMode::Full);
        let mut progress = ProgressStore::new();
        let first = session.start(&progress, fixed_now()).unwrap().id;

        let err = session.answer(&mut progress, 5, fixed_now()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidInput {
                selected: 5,
                options: 4
            }
        ));
        assert_eq!(session.state(), SessionState::InProgress);
        assert_eq!(session.score(), 0);
        assert!(progress.is_empty());
        assert_eq!(session.current().unwrap().id, first);
    }

    #[test]
    fn full_pass_completes_and_reports() {
        let mut session = QuizSession::new(bank(3), settings(None), SessionMode::Full);
        let mut progress = ProgressStore::new();
        session.start(&progress, fixed_now()).unwrap();

        // Unshuffled options: index 0 is always correct.
        assert!(session.answer(&mut progress, 0, fixed_now()).unwrap().was_correct);
        let wrong = session.answer(&mut progress, 2, fixed_now()).unwrap();
        assert!(!wrong.was_correct);
        assert_eq!(wrong.correct_option, "a");
        let last = session.answer(&mut progress, 0, fixed_now()).unwrap();
        assert!(last.is_complete);

        let report = session.summary().unwrap();
        assert_eq!(report.total_asked, 3);
        assert_eq!(report.total_correct, 2);
        assert!(!report.passed);
        assert_eq!(report.missed.len(), 1);
        assert_eq!(report.missed[0].selected_option, "c");

        let distinct: HashSet<_> = session.asked().iter().collect();
        assert_eq!(distinct.len(), 3);
        assert!(matches!(
            session.answer(&mut progress, 0, fixed_now()),
            Err(SessionError::Completed)
        ));
    }

    #[test]
    fn completion_time_never_precedes_start() {
        let started = fixed_now() + chrono::Duration::seconds(5);
        let mut session = QuizSession::new(bank(1), settings(None), SessionMode::Full);
        let mut progress = ProgressStore::new();
        session.start(&progress, started).unwrap();
        session.answer(&mut progress, 0, fixed_now()).unwrap();

        assert_eq!(session.completed_at(), Some(started));
        let summary = session.build_summary().unwrap();
        assert_eq!(summary.completed_at(), summary.started_at());
        assert_eq!(session.summary().unwrap().duration_secs, 0);
    }

    #[test]
    fn summary_is_only_available_when_completed() {
        let mut session = QuizSession::new(bank(2), settings(None), SessionMode::Full);
        assert!(matches!(session.summary(), Err(SessionError::NotCompleted)));
        session.start(&ProgressStore::new(), fixed_now()).unwrap();
        assert!(matches!(session.summary(), Err(SessionError::NotCompleted)));
    }

    #[test]
    fn session_length_limits_questions() {
        let mut session = QuizSession::new(bank(200), settings(Some(10)), SessionMode::Full);
        let mut progress = ProgressStore::new();
        session.start(&progress, fixed_now()).unwrap();
        while !session.is_complete() {
            session.answer(&mut progress, 1, fixed_now()).unwrap();
        }
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.summary().unwrap().total_asked, 10);
        assert_eq!(session.progress().remaining, 0);
    }

    #[test]
    fn shuffled_options_map_back_to_bank_answer() {
        let shuffled = settings(None).with_shuffle_options(true);
        let mut session = QuizSession::new(bank(5), shuffled, SessionMode::Full);
        let mut progress = ProgressStore::new();
        session.start(&progress, fixed_now()).unwrap();

        while let Some(current) = session.current().cloned() {
            let pick = current.options.iter().position(|o| o == "a").unwrap();
            let feedback = session.answer(&mut progress, pick, fixed_now()).unwrap();
            assert!(feedback.was_correct);
        }
        assert_eq!(session.summary().unwrap().total_correct, 5);
    }

    #[test]
    fn missed_mode_draws_only_missed_questions() {
        let bank = bank(4);
        let ids: Vec<_> = bank.ids().collect();
        let mut progress = ProgressStore::new();
        progress.record(ids[1], false, fixed_now());
        progress.record(ids[2], true, fixed_now());

        let mut session = QuizSession::new(Arc::clone(&bank), settings(None), SessionMode::Missed);
        let first = session.start(&progress, fixed_now()).unwrap();
        assert_eq!(first.id, ids[1]);
        assert_eq!(first.planned, 1);
        session.answer(&mut progress, 0, fixed_now()).unwrap();
        assert!(session.is_complete());
    }

    #[test]
    fn empty_bookmark_pool_cannot_start() {
        let mut session = QuizSession::new(bank(3), settings(None), SessionMode::Bookmarked);
        let err = session.start(&ProgressStore::new(), fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::Empty));
        assert_eq!(session.state(), SessionState::NotStarted);
    }
}

use chrono::{DateTime, Utc};

use quiz_core::model::{ProgressStore, QuestionBank, SessionMode, SessionSummary};
use quiz_core::time::elapsed_secs;

/// Presentation-agnostic list item for a past session.
///
/// No pre-formatted strings; the host formats timestamps and percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub mode: SessionMode,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_asked: u32,
    pub total_correct: u32,
    pub accuracy: f64,
    pub passed: bool,
    pub duration_secs: u64,
}

impl HistoryItem {
    #[must_use]
    pub fn from_summary(summary: &SessionSummary, pass_percentage: u8) -> Self {
        Self {
            mode: summary.mode(),
            started_at: summary.started_at(),
            completed_at: summary.completed_at(),
            total_asked: summary.total_asked(),
            total_correct: summary.total_correct(),
            accuracy: summary.accuracy(),
            passed: summary.passed(pass_percentage),
            duration_secs: elapsed_secs(summary.started_at(), summary.completed_at()),
        }
    }
}

/// Bank-relative snapshot of a profile's progress.
///
/// Records for questions no longer in the bank are not counted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressOverview {
    pub total_questions: usize,
    pub attempted: usize,
    pub mastered: usize,
    pub missed: usize,
    pub remaining: usize,
    pub bookmarked: usize,
    /// Oldest first.
    pub history: Vec<HistoryItem>,
}

impl ProgressOverview {
    #[must_use]
    pub fn build(bank: &QuestionBank, progress: &ProgressStore, pass_percentage: u8) -> Self {
        let attempted = progress.attempted_count(bank);
        Self {
            total_questions: bank.len(),
            attempted,
            mastered: progress.mastered_count(bank),
            missed: progress.missed_ids(bank).len(),
            remaining: bank.len().saturating_sub(attempted),
            bookmarked: progress.bookmarked_ids(bank).len(),
            history: progress
                .history()
                .iter()
                .map(|s| HistoryItem::from_summary(s, pass_percentage))
                .collect(),
        }
    }

    /// Share of the bank whose latest answer was correct.
    #[must_use]
    pub fn mastery(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.mastered as f64 / self.total_questions as f64;
        ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{QuestionDraft, QuestionId};
    use quiz_core::time::fixed_now;

    fn bank() -> QuestionBank {
        let questions = ["Stop?", "Yield?", "Merge?", "Park?"]
            .iter()
            .map(|p| {
                QuestionDraft {
                    prompt: (*p).to_owned(),
                    options: vec!["yes".into(), "no".into()],
                    correct: 0,
                    explanation: String::new(),
                    category: None,
                }
                .validate(0)
                .unwrap()
            })
            .collect();
        QuestionBank::new(questions).unwrap()
    }

    #[test]
    fn overview_counts_are_bank_relative() {
        let bank = bank();
        let ids: Vec<_> = bank.ids().collect();
        let now = fixed_now();
        let mut progress = ProgressStore::new();
        progress.record(ids[0], true, now);
        progress.record(ids[1], false, now);
        progress.record(QuestionId::new(0xdead), true, now);
        progress.toggle_bookmark(ids[2]);
        progress.toggle_bookmark(QuestionId::new(0xbeef));

        let overview = ProgressOverview::build(&bank, &progress, 80);

        assert_eq!(overview.total_questions, 4);
        assert_eq!(overview.attempted, 2);
        assert_eq!(overview.mastered, 1);
        assert_eq!(overview.missed, 1);
        assert_eq!(overview.remaining, 2);
        assert_eq!(overview.bookmarked, 1);
        assert!((overview.mastery() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn history_items_carry_pass_flag() {
        let now = fixed_now();
        let mut progress = ProgressStore::new();
        progress.push_summary(
            SessionSummary::new(SessionMode::Full, now, now + Duration::minutes(3), 5, 4).unwrap(),
        );
        progress.push_summary(
            SessionSummary::new(SessionMode::Missed, now, now + Duration::minutes(1), 2, 1)
                .unwrap(),
        );

        let overview = ProgressOverview::build(&bank(), &progress, 80);

        assert_eq!(overview.history.len(), 2);
        assert!(overview.history[0].passed);
        assert!(!overview.history[1].passed);
        assert_eq!(overview.history[0].duration_secs, 180);
        assert_eq!(overview.history[1].mode, SessionMode::Missed);
    }
}

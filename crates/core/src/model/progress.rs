use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::bank::QuestionBank;
use crate::model::ids::QuestionId;
use crate::model::outcome::OutcomeRecord;
use crate::model::session::SessionSummary;
use crate::weighting::WeightPolicy;

/// Per-question answer history plus past session scores and bookmarks.
///
/// The store is an ordinary owned value: it is loaded once per run, passed by
/// reference to whatever records answers, and handed back to storage to save.
/// Records for questions that are no longer in the bank are kept untouched and
/// skipped by every bank-relative query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressStore {
    records: BTreeMap<QuestionId, OutcomeRecord>,
    history: Vec<SessionSummary>,
    bookmarks: BTreeSet<QuestionId>,
}

impl ProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a store from persisted parts.
    #[must_use]
    pub fn from_parts(
        records: BTreeMap<QuestionId, OutcomeRecord>,
        history: Vec<SessionSummary>,
        bookmarks: BTreeSet<QuestionId>,
    ) -> Self {
        Self {
            records,
            history,
            bookmarks,
        }
    }

    /// Fold one answer into the history of `question_id`.
    pub fn record(&mut self, question_id: QuestionId, was_correct: bool, at: DateTime<Utc>) {
        self.records
            .entry(question_id)
            .and_modify(|rec| rec.record(was_correct, at))
            .or_insert_with(|| OutcomeRecord::first(was_correct, at));
    }

    #[must_use]
    pub fn outcome(&self, question_id: QuestionId) -> Option<&OutcomeRecord> {
        self.records.get(&question_id)
    }

    /// All records, including stale ones, ordered by id.
    pub fn records(&self) -> impl Iterator<Item = (QuestionId, &OutcomeRecord)> {
        self.records.iter().map(|(id, rec)| (*id, rec))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.history.is_empty() && self.bookmarks.is_empty()
    }

    /// Selection weight under the default policy.
    #[must_use]
    pub fn weight_for(&self, question_id: QuestionId) -> f64 {
        self.weight_for_with(question_id, &WeightPolicy::default())
    }

    #[must_use]
    pub fn weight_for_with(&self, question_id: QuestionId, policy: &WeightPolicy) -> f64 {
        policy.weight(self.outcome(question_id))
    }

    //
    // ─── HISTORY ────────────────────────────────────────────────────────────
    //

    pub fn push_summary(&mut self, summary: SessionSummary) {
        self.history.push(summary);
    }

    /// Past sessions, oldest first.
    #[must_use]
    pub fn history(&self) -> &[SessionSummary] {
        &self.history
    }

    //
    // ─── BOOKMARKS ──────────────────────────────────────────────────────────
    //

    /// Flip the bookmark on a question; returns whether it is now bookmarked.
    pub fn toggle_bookmark(&mut self, question_id: QuestionId) -> bool {
        if self.bookmarks.remove(&question_id) {
            false
        } else {
            self.bookmarks.insert(question_id);
            true
        }
    }

    #[must_use]
    pub fn is_bookmarked(&self, question_id: QuestionId) -> bool {
        self.bookmarks.contains(&question_id)
    }

    pub fn bookmarks(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.bookmarks.iter().copied()
    }

    //
    // ─── BANK-RELATIVE QUERIES ──────────────────────────────────────────────
    //

    /// Bank questions answered at least once.
    #[must_use]
    pub fn attempted_count(&self, bank: &QuestionBank) -> usize {
        bank.ids().filter(|id| self.records.contains_key(id)).count()
    }

    /// Bank questions whose latest answer was correct.
    #[must_use]
    pub fn mastered_count(&self, bank: &QuestionBank) -> usize {
        bank.ids()
            .filter(|id| self.records.get(id).is_some_and(OutcomeRecord::last_result))
            .count()
    }

    /// Bank questions whose latest answer was wrong, in bank order.
    #[must_use]
    pub fn missed_ids(&self, bank: &QuestionBank) -> Vec<QuestionId> {
        bank.ids()
            .filter(|id| self.records.get(id).is_some_and(|rec| !rec.last_result()))
            .collect()
    }

    /// Bookmarked questions still present in the bank, in bank order.
    #[must_use]
    pub fn bookmarked_ids(&self, bank: &QuestionBank) -> Vec<QuestionId> {
        bank.ids().filter(|id| self.bookmarks.contains(id)).collect()
    }
}

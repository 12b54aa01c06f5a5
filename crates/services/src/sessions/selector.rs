use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use std::collections::HashSet;
use tracing::debug;

use quiz_core::WeightPolicy;
use quiz_core::model::{ProgressStore, Question, QuestionBank, QuestionId};

use crate::error::SelectError;

/// Picks the next question by weighted random draw over the bank.
///
/// Weights come from each question's history (see `WeightPolicy`): unseen and
/// recently missed questions are favored, mastered ones stay reachable.
/// The weight table is rebuilt on every call in bank order, so a seeded RNG
/// gives a reproducible sequence.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveSelector {
    policy: WeightPolicy,
}

impl AdaptiveSelector {
    #[must_use]
    pub fn new(policy: WeightPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &WeightPolicy {
        &self.policy
    }

    /// Candidate questions not in `excluding`, paired with their weights.
    #[must_use]
    pub fn weight_table<'b>(
        &self,
        bank: &'b QuestionBank,
        progress: &ProgressStore,
        excluding: &HashSet<QuestionId>,
    ) -> Vec<(&'b Question, f64)> {
        bank.iter()
            .filter(|q| !excluding.contains(&q.id()))
            .map(|q| (q, progress.weight_for_with(q.id(), &self.policy)))
            .collect()
    }

    /// Draw the next question.
    ///
    /// # Errors
    ///
    /// Returns `SelectError::Exhausted` when every question is excluded.
    pub fn next<'b, R: Rng + ?Sized>(
        &self,
        bank: &'b QuestionBank,
        progress: &ProgressStore,
        excluding: &HashSet<QuestionId>,
        rng: &mut R,
    ) -> Result<&'b Question, SelectError> {
        let table = self.weight_table(bank, progress, excluding);
        if table.is_empty() {
            return Err(SelectError::Exhausted);
        }
        // Weights are finite and strictly positive, so construction only fails
        // on an empty table, which is handled above.
        let dist = WeightedIndex::new(table.iter().map(|(_, w)| *w))
            .map_err(|_| SelectError::Exhausted)?;
        let (question, weight) = table[dist.sample(rng)];
        debug!(
            question = %question.id(),
            weight,
            candidates = table.len(),
            "selected question"
        );
        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionDraft;
    use quiz_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bank(n: usize) -> QuestionBank {
        let questions = (0..n)
            .map(|i| {
                QuestionDraft {
                    prompt: format!("Question {i}?"),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct: i % 4,
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
    fn full_exclusion_is_exhausted() {
        let bank = bank(5);
        let excluding: HashSet<_> = bank.ids().collect();
        let mut rng = StdRng::seed_from_u64(1);
        let err = AdaptiveSelector::default()
            .next(&bank, &ProgressStore::new(), &excluding, &mut rng)
            .unwrap_err();
        assert_eq!(err, SelectError::Exhausted);
    }

    #[test]
    fn growing_exclusion_visits_each_question_once() {
        let bank = bank(3);
        let selector = AdaptiveSelector::default();
        let progress = ProgressStore::new();
        let mut rng = StdRng::seed_from_u64(42);
        let mut excluding = HashSet::new();
        let mut visited = Vec::new();

        loop {
            match selector.next(&bank, &progress, &excluding, &mut rng) {
                Ok(q) => {
                    assert!(excluding.insert(q.id()), "question drawn twice");
                    visited.push(q.id());
                }
                Err(SelectError::Exhausted) => break,
            }
        }

        assert_eq!(visited.len(), 3);
        let all: HashSet<_> = bank.ids().collect();
        assert_eq!(excluding, all);
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let bank = bank(20);
        let selector = AdaptiveSelector::default();
        let progress = ProgressStore::new();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| {
                    selector
                        .next(&bank, &progress, &HashSet::new(), &mut rng)
                        .unwrap()
                        .id()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(9), draw(9));
    }

    #[test]
    fn empty_progress_gives_uniform_weights() {
        let bank = bank(4);
        let table = AdaptiveSelector::default().weight_table(
            &bank,
            &ProgressStore::new(),
            &HashSet::new(),
        );
        assert_eq!(table.len(), 4);
        assert!(table.iter().all(|(_, w)| *w == table[0].1));
    }

    #[test]
    fn missed_questions_are_drawn_more_often() {
        let bank = bank(2);
        let ids: Vec<_> = bank.ids().collect();
        let mut progress = ProgressStore::new();
        let now = fixed_now();
        progress.record(ids[0], false, now);
        for _ in 0..5 {
            progress.record(ids[1], true, now);
        }

        let selector = AdaptiveSelector::default();
        let mut rng = StdRng::seed_from_u64(7);
        let missed_hits = (0..2_000)
            .filter(|_| {
                selector
                    .next(&bank, &progress, &HashSet::new(), &mut rng)
                    .unwrap()
                    .id()
                    == ids[0]
            })
            .count();
        // Weights 2.0 vs 1/6: the missed question should win roughly 92% of draws.
        assert!(missed_hits > 1_600, "missed question drawn {missed_hits} times");
    }
}

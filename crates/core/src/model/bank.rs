use std::collections::HashMap;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::Question;
use crate::text::prompt_key;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BankModelError {
    #[error("question bank is empty")]
    Empty,

    #[error("question id {0} appears more than once")]
    DuplicateId(QuestionId),
}

/// Ordered, immutable collection of questions with lookup by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
    index: HashMap<QuestionId, usize>,
}

impl QuestionBank {
    /// Build a bank, keeping the given order.
    ///
    /// # Errors
    ///
    /// Returns `BankModelError::Empty` for an empty list and
    /// `BankModelError::DuplicateId` if two questions share an id.
    pub fn new(questions: Vec<Question>) -> Result<Self, BankModelError> {
        if questions.is_empty() {
            return Err(BankModelError::Empty);
        }
        let mut index = HashMap::with_capacity(questions.len());
        for (pos, q) in questions.iter().enumerate() {
            if index.insert(q.id(), pos).is_some() {
                return Err(BankModelError::DuplicateId(q.id()));
            }
        }
        Ok(Self { questions, index })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.index.get(&id).map(|&pos| &self.questions[pos])
    }

    #[must_use]
    pub fn contains(&self, id: QuestionId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.questions.iter().map(Question::id)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Groups of questions whose prompts match case-insensitively, in bank order.
    #[must_use]
    pub fn duplicate_prompts(&self) -> Vec<Vec<QuestionId>> {
        let mut groups: Vec<(String, Vec<QuestionId>)> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();
        for q in &self.questions {
            let key = prompt_key(q.prompt());
            match by_key.get(&key) {
                Some(&slot) => groups[slot].1.push(q.id()),
                None => {
                    by_key.insert(key.clone(), groups.len());
                    groups.push((key, vec![q.id()]));
                }
            }
        }
        groups
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(_, ids)| ids)
            .collect()
    }
}

impl<'a> IntoIterator for &'a QuestionBank {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.questions.iter()
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::text::clean_text;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least 2 options, found {found}")]
    TooFewOptions { found: usize },

    #[error("correct option index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },

    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

//
// ─── CATEGORY ──────────────────────────────────────────────────────────────────
//

/// Coarse kind of a driving-test question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Identifying road signs and signals.
    Sign,
    /// Rules of the road, licensing and legal requirements.
    Rule,
    /// "What should you do when..." situations.
    Scenario,
}

const SIGN_HINTS: &[&str] = &["sign", "signal", "arrow", "marking", "symbol"];
const SCENARIO_HINTS: &[&str] = &["what should you do", "you are", "if you", "when you"];

impl Category {
    /// Best-effort category for rows that leave the column blank.
    #[must_use]
    pub fn infer(prompt: &str) -> Self {
        let lower = prompt.to_lowercase();
        if SIGN_HINTS.iter().any(|hint| lower.contains(hint)) {
            Self::Sign
        } else if SCENARIO_HINTS.iter().any(|hint| lower.contains(hint)) {
            Self::Scenario
        } else {
            Self::Rule
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sign => "sign",
            Self::Rule => "rule",
            Self::Scenario => "scenario",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sign" | "signs" | "road sign" | "road signs" => Ok(Self::Sign),
            "rule" | "rules" | "law" | "laws" => Ok(Self::Rule),
            "scenario" | "scenarios" | "situation" => Ok(Self::Scenario),
            other => Err(QuestionError::UnknownCategory(other.to_owned())),
        }
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// Study topic used for review hints, inferred from prompt keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Licensing,
    RulesAndRegulations,
    RoadSigns,
    Safety,
    TrafficLaws,
    Insurance,
    Violations,
    VehicleOperation,
    GeneralKnowledge,
}

/// Keyword table, checked in order; the first topic with a hit wins.
const TOPIC_KEYWORDS: &[(Topic, &[&str])] = &[
    (
        Topic::Licensing,
        &["license", "permit", "renewal", "application", "fee", "valid", "provisional", "duplicate"],
    ),
    (
        Topic::RulesAndRegulations,
        &["law", "legal", "requirement", "required", "must", "penalty", "consequence"],
    ),
    (
        Topic::RoadSigns,
        &["sign", "signal", "yield", "turn", "crossing", "arrow", "warning", "regulatory"],
    ),
    (
        Topic::Safety,
        &["safety", "accident", "crash", "emergency", "caution", "danger", "hazard", "defensive"],
    ),
    (
        Topic::TrafficLaws,
        &["traffic", "speed", "right of way", "lane", "merge", "stop", "passing"],
    ),
    (
        Topic::Insurance,
        &["insurance", "coverage", "liability", "no-fault", "policy", "premium"],
    ),
    (
        Topic::Violations,
        &["dui", "violation", "suspended", "revoked", "ticket", "offense", "fine"],
    ),
    (
        Topic::VehicleOperation,
        &["drive", "driving", "vehicle", "operation", "operate", "steering", "brake", "accelerate"],
    ),
];

impl Topic {
    #[must_use]
    pub fn infer(prompt: &str) -> Self {
        let lower = prompt.to_lowercase();
        TOPIC_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map_or(Self::GeneralKnowledge, |(topic, _)| *topic)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Licensing => "Licensing",
            Self::RulesAndRegulations => "Rules and Regulations",
            Self::RoadSigns => "Road Signs",
            Self::Safety => "Safety",
            Self::TrafficLaws => "Traffic Laws",
            Self::Insurance => "Insurance",
            Self::Violations => "Violations",
            Self::VehicleOperation => "Vehicle Operation",
            Self::GeneralKnowledge => "General Knowledge",
        }
    }
}

impl Topic {
    /// Explanation for a question whose bank row has none.
    ///
    /// Topics with a template use it when the prompt mentions one of the
    /// topic's trigger words; everything else names the answer.
    #[must_use]
    pub fn fallback_explanation(self, prompt: &str, answer: &str) -> String {
        let lower = prompt.to_lowercase();
        let triggers: &[&str] = match self {
            Self::Licensing => &["minimum", "required", "valid", "fee"],
            Self::RulesAndRegulations => &["must", "required", "legal", "law"],
            Self::RoadSigns => &["sign", "signal"],
            Self::Safety => &["safety", "emergency", "caution"],
            Self::TrafficLaws => &["speed", "right of way", "right-of-way", "lane", "merge", "stop"],
            Self::VehicleOperation => &["drive", "driving", "vehicle", "operate", "control"],
            Self::Insurance | Self::Violations | Self::GeneralKnowledge => &[],
        };
        let context = question_context(&lower);
        if context.is_empty() || !triggers.iter().any(|t| lower.contains(t)) {
            return format!("The correct answer is {answer}.");
        }
        match self {
            Self::Licensing => format!("{answer} is the licensing requirement for {context}."),
            Self::RulesAndRegulations => format!("By law, {answer} applies to {context}."),
            Self::RoadSigns => format!("This sign or signal means {answer}."),
            Self::Safety => format!("For safety, {answer} is the right action when {context}."),
            Self::TrafficLaws => format!("Traffic law: {answer} for {context}."),
            Self::VehicleOperation => {
                format!("When operating a vehicle, {answer} is the correct procedure for {context}.")
            }
            Self::Insurance | Self::Violations | Self::GeneralKnowledge => {
                format!("The correct answer is {answer}.")
            }
        }
    }
}

/// Lowercased prompt with its leading question words and `?` removed.
fn question_context(lower: &str) -> String {
    let mut rest = lower.trim();
    for lead in ["what is ", "what should ", "what must ", "what does "] {
        if let Some(stripped) = rest.strip_prefix(lead) {
            rest = stripped;
            break;
        }
    }
    rest.replace('?', "").trim().to_owned()
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question as read from a bank row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct: usize,
    pub explanation: String,
    pub category: Option<Category>,
}

impl QuestionDraft {
    /// Clean all text fields and check the shape of the question.
    ///
    /// `occurrence` counts earlier questions in the same bank with the same
    /// prompt and only affects the derived id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt is blank, fewer than two
    /// options remain, or the correct index does not point at an option.
    pub fn validate(self, occurrence: usize) -> Result<Question, QuestionError> {
        let prompt = clean_text(&self.prompt);
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }

        let options: Vec<String> = self.options.iter().map(|o| clean_text(o)).collect();
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                found: options.len(),
            });
        }
        if self.correct >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: self.correct,
                len: options.len(),
            });
        }

        let topic = Topic::infer(&prompt);
        let mut explanation = clean_text(&self.explanation);
        if explanation.is_empty() {
            explanation = topic.fallback_explanation(&prompt, &options[self.correct]);
        }

        Ok(Question {
            id: QuestionId::from_prompt(&prompt, occurrence),
            category: self.category.unwrap_or_else(|| Category::infer(&prompt)),
            topic,
            prompt,
            options,
            correct: self.correct,
            explanation,
        })
    }
}

/// A validated multiple-choice question. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct: usize,
    explanation: String,
    category: Category,
    topic: Topic,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Zero-based index of the correct option; always within `options()`.
    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct]
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn topic(&self) -> Topic {
        self.topic
    }

    #[must_use]
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(prompt: &str, options: &[&str], correct: usize) -> QuestionDraft {
        QuestionDraft {
            prompt: prompt.to_owned(),
            options: options.iter().map(|o| (*o).to_owned()).collect(),
            correct,
            explanation: String::new(),
            category: None,
        }
    }

    #[test]
    fn validate_builds_question_with_fallback_explanation() {
        let q = draft("What is the speed limit in a residential area?", &["30 mph", "25 mph"], 0)
            .validate(0)
            .unwrap();
        assert_eq!(q.correct_option(), "30 mph");
        assert_eq!(
            q.explanation(),
            "Traffic law: 30 mph for the speed limit in a residential area."
        );
        assert_eq!(q.topic(), Topic::TrafficLaws);
    }

    #[test]
    fn fallback_explanation_names_answer_without_template_match() {
        assert_eq!(
            Topic::Insurance.fallback_explanation("Is insurance mandatory?", "Yes"),
            "The correct answer is Yes."
        );
        // Topic inferred from "turn", but no sign or signal trigger word.
        assert_eq!(
            Topic::RoadSigns.fallback_explanation("When may you turn left?", "On green"),
            "The correct answer is On green."
        );
        assert_eq!(
            Topic::RoadSigns.fallback_explanation("What does a yellow diamond sign mean?", "Warning"),
            "This sign or signal means Warning."
        );
    }

    #[test]
    fn validate_rejects_out_of_range_index() {
        let err = draft("Q?", &["a", "b", "c"], 3).validate(0).unwrap_err();
        assert_eq!(err, QuestionError::CorrectIndexOutOfRange { index: 3, len: 3 });
    }

    #[test]
    fn validate_rejects_single_option() {
        let err = draft("Q?", &["only"], 0).validate(0).unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions { found: 1 });
    }

    #[test]
    fn validate_rejects_blank_prompt() {
        let err = draft("   ", &["a", "b"], 0).validate(0).unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }

    #[test]
    fn category_parses_aliases_and_infers_when_missing() {
        assert_eq!("Road Signs".parse::<Category>().unwrap(), Category::Sign);
        assert_eq!("LAW".parse::<Category>().unwrap(), Category::Rule);
        assert!("weather".parse::<Category>().is_err());
        assert_eq!(Category::infer("What does this sign mean?"), Category::Sign);
        assert_eq!(
            Category::infer("If you are involved in a crash, what should you do?"),
            Category::Scenario
        );
        assert_eq!(Category::infer("How many points lead to suspension?"), Category::Rule);
    }

    #[test]
    fn topic_falls_back_to_general_knowledge() {
        assert_eq!(Topic::infer("How old is the sun?"), Topic::GeneralKnowledge);
        assert_eq!(Topic::infer("How long is a learner permit valid?"), Topic::Licensing);
    }
}

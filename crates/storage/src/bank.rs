//! CSV question-bank loader.
//!
//! The first row names the columns. Recognized headers (case and punctuation
//! ignored): `question`/`prompt`, any header starting with `option`,
//! `correct`/`correct answer`/`correct option index`/`answer`, `explanation`,
//! and `category`. Other columns are ignored, so rows may carry extra trailing
//! cells. Blank option cells are skipped; the correct answer is a zero-based
//! index into the remaining options, a letter (`a`, `b)`, ...), or the text of
//! one of the options. A cell matching an option's text always resolves to that
//! option, even when it also reads as an index.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use quiz_core::model::{
    BankModelError, Category, Question, QuestionBank, QuestionDraft, QuestionError,
};
use quiz_core::text::{clean_text, prompt_key};
use thiserror::Error;
use tracing::{info, warn};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// What was wrong with a bank row or header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FormatErrorKind {
    #[error("missing `{0}` column")]
    MissingColumn(&'static str),
    #[error("missing question prompt")]
    MissingPrompt,
    #[error("missing correct answer")]
    MissingCorrect,
    #[error("correct answer {0:?} matches no option")]
    UnmatchedCorrect(String),
    #[error("needs at least 2 options, found {found}")]
    TooFewOptions { found: usize },
    #[error("correct option index {index} is out of range for {len} options")]
    CorrectOutOfRange { index: usize, len: usize },
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
}

/// Errors emitted while loading a question bank. All of them are fatal to startup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("question bank line {line}: {kind}")]
    Format { line: u64, kind: FormatErrorKind },
    #[error("question bank has no questions")]
    Empty,
    #[error(transparent)]
    Model(#[from] BankModelError),
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl BankError {
    fn format(line: u64, kind: FormatErrorKind) -> Self {
        Self::Format { line, kind }
    }
}

//
// ─── COLUMNS ───────────────────────────────────────────────────────────────────
//

struct Columns {
    prompt: usize,
    options: Vec<usize>,
    correct: usize,
    explanation: Option<usize>,
    category: Option<usize>,
}

fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, BankError> {
        let mut prompt = None;
        let mut options = Vec::new();
        let mut correct = None;
        let mut explanation = None;
        let mut category = None;

        for (idx, raw) in headers.iter().enumerate() {
            let name = normalize_header(raw);
            match name.as_str() {
                "" => {}
                "question" | "prompt" => prompt = prompt.or(Some(idx)),
                "correct" | "correctanswer" | "correctoptionindex" | "correctindex" | "answer" => {
                    correct = correct.or(Some(idx));
                }
                "explanation" => explanation = explanation.or(Some(idx)),
                "category" => category = category.or(Some(idx)),
                other if other.starts_with("option") => options.push(idx),
                _ => {}
            }
        }

        let missing = |col| BankError::format(1, FormatErrorKind::MissingColumn(col));
        let prompt = prompt.ok_or_else(|| missing("question"))?;
        let correct = correct.ok_or_else(|| missing("correct"))?;
        if options.is_empty() {
            return Err(missing("option"));
        }
        Ok(Self {
            prompt,
            options,
            correct,
            explanation,
            category,
        })
    }
}

fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("").trim()
}

/// Drop an `a) ` style label some exports prefix options with.
fn strip_letter_label(option: &str) -> &str {
    let bytes = option.as_bytes();
    if bytes.len() > 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b')' {
        option[2..].trim_start()
    } else {
        option
    }
}

fn letter_index(raw: &str) -> Option<usize> {
    let lower = raw.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let is_letter = match bytes {
        [c] => c.is_ascii_lowercase(),
        [c, b')', ..] => c.is_ascii_lowercase(),
        _ => false,
    };
    is_letter.then(|| usize::from(bytes[0] - b'a'))
}

/// Option text wins over an index reading, so a numeric answer such as `30`
/// among `25,30,35` selects the option `30`, not position 30.
fn resolve_correct(raw: &str, options: &[String]) -> Result<usize, FormatErrorKind> {
    let wanted = clean_text(strip_letter_label(raw)).to_lowercase();
    if let Some(pos) = options.iter().position(|o| o.to_lowercase() == wanted) {
        return Ok(pos);
    }
    if let Ok(index) = raw.parse::<usize>() {
        return Ok(index);
    }
    letter_index(raw).ok_or_else(|| FormatErrorKind::UnmatchedCorrect(raw.to_owned()))
}

fn question_error_kind(err: QuestionError) -> FormatErrorKind {
    match err {
        QuestionError::EmptyPrompt => FormatErrorKind::MissingPrompt,
        QuestionError::TooFewOptions { found } => FormatErrorKind::TooFewOptions { found },
        QuestionError::CorrectIndexOutOfRange { index, len } => {
            FormatErrorKind::CorrectOutOfRange { index, len }
        }
        QuestionError::UnknownCategory(raw) => FormatErrorKind::UnknownCategory(raw),
        other => FormatErrorKind::UnmatchedCorrect(other.to_string()),
    }
}

//
// ─── LOADING ───────────────────────────────────────────────────────────────────
//

/// Load and validate a question bank from a CSV file.
///
/// # Errors
///
/// Returns `BankError` if the file cannot be read, a row is malformed, or the
/// bank contains no questions.
pub fn load_bank(path: impl AsRef<Path>) -> Result<QuestionBank, BankError> {
    let path = path.as_ref();
    let bank = parse_bank(File::open(path)?)?;
    info!(path = %path.display(), questions = bank.len(), "loaded question bank");
    Ok(bank)
}

/// Parse a question bank from any CSV source.
///
/// Questions keep row order; one question is produced per data row.
///
/// # Errors
///
/// Returns `BankError::Format` naming the first offending line.
pub fn parse_bank(source: impl Read) -> Result<QuestionBank, BankError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source);

    let columns = Columns::from_headers(reader.headers()?)?;
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut questions: Vec<Question> = Vec::new();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, csv::Position::line);

        let prompt = cell(&record, columns.prompt);
        if prompt.is_empty() {
            return Err(BankError::format(line, FormatErrorKind::MissingPrompt));
        }

        let options: Vec<String> = columns
            .options
            .iter()
            .map(|&idx| strip_letter_label(cell(&record, idx)))
            .filter(|o| !o.is_empty())
            .map(clean_text)
            .collect();

        let raw_correct = cell(&record, columns.correct);
        if raw_correct.is_empty() {
            return Err(BankError::format(line, FormatErrorKind::MissingCorrect));
        }
        let correct =
            resolve_correct(raw_correct, &options).map_err(|kind| BankError::format(line, kind))?;

        let category = match columns.category.map(|idx| cell(&record, idx)) {
            Some(raw) if !raw.is_empty() => Some(
                raw.parse::<Category>()
                    .map_err(|e| BankError::format(line, question_error_kind(e)))?,
            ),
            _ => None,
        };

        let explanation = columns
            .explanation
            .map(|idx| cell(&record, idx).to_owned())
            .unwrap_or_default();

        let seen = occurrences.entry(prompt_key(prompt)).or_insert(0);
        let occurrence = *seen;
        *seen += 1;

        let question = QuestionDraft {
            prompt: prompt.to_owned(),
            options,
            correct,
            explanation,
            category,
        }
        .validate(occurrence)
        .map_err(|e| BankError::format(line, question_error_kind(e)))?;
        questions.push(question);
    }

    if questions.is_empty() {
        return Err(BankError::Empty);
    }

    let bank = QuestionBank::new(questions)?;
    for group in bank.duplicate_prompts() {
        if let Some(first) = group.first().and_then(|id| bank.get(*id)) {
            warn!(prompt = first.prompt(), copies = group.len(), "duplicate question prompt");
        }
    }
    Ok(bank)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

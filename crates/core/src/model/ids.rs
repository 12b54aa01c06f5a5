use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::text::prompt_key;

/// Stable identifier for a Question, derived from its prompt text.
///
/// The id survives reordering of the bank file; editing the prompt
/// produces a new id and the old history is left behind as stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(u64);

impl QuestionId {
    /// Creates a new `QuestionId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Derive the id for the `occurrence`-th appearance (zero-based) of a prompt.
    ///
    /// The first occurrence hashes the normalized prompt alone, so ids do not
    /// change when a duplicate is later removed from the bank.
    #[must_use]
    pub fn from_prompt(prompt: &str, occurrence: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(prompt_key(prompt).as_bytes());
        if occurrence > 0 {
            // NUL never survives `clean_text`, so no prompt can end in this suffix.
            hasher.update([0_u8]);
            hasher.update(u64::try_from(occurrence).unwrap_or(u64::MAX).to_be_bytes());
        }
        let digest = hasher.finalize();
        let mut head = [0_u8; 8];
        head.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(head))
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({:016x})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Error type for parsing an id from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    raw: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse QuestionId from {:?}", self.raw)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for QuestionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16)
            .map(QuestionId::new)
            .map_err(|_| ParseIdError { raw: s.to_owned() })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_fixed_width_hex() {
        assert_eq!(QuestionId::new(255).to_string(), "00000000000000ff");
    }

    #[test]
    fn id_roundtrips_through_string() {
        let original = QuestionId::from_prompt("What does a red octagon mean?", 0);
        let parsed: QuestionId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn from_str_rejects_garbage() {
        assert!("not-hex".parse::<QuestionId>().is_err());
    }

    #[test]
    fn prompt_id_ignores_case_and_whitespace() {
        assert_eq!(
            QuestionId::from_prompt("When must you  STOP?", 0),
            QuestionId::from_prompt("when must you stop?", 0)
        );
    }

    #[test]
    fn duplicate_occurrences_get_distinct_ids() {
        let first = QuestionId::from_prompt("Same prompt", 0);
        let second = QuestionId::from_prompt("Same prompt", 1);
        assert_ne!(first, second);
    }

    #[test]
    fn occurrence_suffix_cannot_be_spelled_in_a_prompt() {
        let repeated = QuestionId::from_prompt("Stop", 1);
        assert_ne!(repeated, QuestionId::from_prompt("Stop#1", 0));
        assert_ne!(repeated, QuestionId::from_prompt("Stop\u{0}\u{0}", 0));
    }
}

//! Persisted shape of the progress document.
//!
//! Mirrors the domain `ProgressStore` so the file format can evolve without
//! leaking serde concerns into the domain layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use quiz_core::model::{OutcomeRecord, ProgressStore, QuestionId, SessionMode, SessionSummary};

use crate::repository::StorageError;

pub(crate) const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ProgressDocument {
    pub version: u32,
    #[serde(default)]
    pub records: BTreeMap<String, RecordEntry>,
    #[serde(default)]
    pub history: Vec<SummaryEntry>,
    #[serde(default)]
    pub bookmarks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RecordEntry {
    pub attempts: u32,
    pub correct: u32,
    pub streak: u32,
    pub last_result: bool,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SummaryEntry {
    pub mode: SessionMode,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_asked: u32,
    pub total_correct: u32,
}

fn parse_id(raw: &str) -> Result<QuestionId, StorageError> {
    raw.parse()
        .map_err(|e: quiz_core::model::ParseIdError| StorageError::Serialization(e.to_string()))
}

impl ProgressDocument {
    pub(crate) fn from_store(store: &ProgressStore) -> Self {
        let records = store
            .records()
            .map(|(id, rec)| {
                (
                    id.to_string(),
                    RecordEntry {
                        attempts: rec.attempts(),
                        correct: rec.correct(),
                        streak: rec.streak(),
                        last_result: rec.last_result(),
                        last_seen: rec.last_seen(),
                    },
                )
            })
            .collect();
        let history = store
            .history()
            .iter()
            .map(|s| SummaryEntry {
                mode: s.mode(),
                started_at: s.started_at(),
                completed_at: s.completed_at(),
                total_asked: s.total_asked(),
                total_correct: s.total_correct(),
            })
            .collect();
        let bookmarks = store.bookmarks().map(|id| id.to_string()).collect();

        Self {
            version: DOCUMENT_VERSION,
            records,
            history,
            bookmarks,
        }
    }

    /// Convert the document back into a domain store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for an unknown version, unparsable ids, or
    /// counters that violate record invariants.
    pub(crate) fn into_store(self) -> Result<ProgressStore, StorageError> {
        if self.version != DOCUMENT_VERSION {
            return Err(StorageError::UnsupportedVersion(self.version));
        }

        let mut records = BTreeMap::new();
        for (raw_id, entry) in self.records {
            let record = OutcomeRecord::from_persisted(
                entry.attempts,
                entry.correct,
                entry.streak,
                entry.last_result,
                entry.last_seen,
            )
            .map_err(|e| StorageError::Serialization(format!("record {raw_id}: {e}")))?;
            records.insert(parse_id(&raw_id)?, record);
        }

        let history = self
            .history
            .into_iter()
            .map(|s| {
                SessionSummary::new(
                    s.mode,
                    s.started_at,
                    s.completed_at,
                    s.total_asked,
                    s.total_correct,
                )
                .map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let bookmarks = self
            .bookmarks
            .iter()
            .map(|raw| parse_id(raw))
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(ProgressStore::from_parts(records, history, bookmarks))
    }
}

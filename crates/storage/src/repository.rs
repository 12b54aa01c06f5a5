use quiz_core::model::ProgressStore;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unsupported progress document version {0}")]
    UnsupportedVersion(u32),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Saved progress could not be used; the caller continues with an empty store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("saved progress could not be restored ({reason}); starting fresh")]
pub struct RecoverableWarning {
    pub path: Option<PathBuf>,
    pub reason: String,
}

/// Result of loading progress: always a usable store, plus an optional notice.
#[derive(Debug, Clone, Default)]
pub struct LoadedProgress {
    pub store: ProgressStore,
    pub warning: Option<RecoverableWarning>,
}

impl LoadedProgress {
    #[must_use]
    pub fn fresh() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn recovered(reason: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self {
            store: ProgressStore::new(),
            warning: Some(RecoverableWarning {
                path,
                reason: reason.into(),
            }),
        }
    }
}

/// Repository contract for the progress store.
pub trait ProgressRepository: Send + Sync {
    /// Load saved progress.
    ///
    /// Never fails: missing state yields an empty store, unreadable state yields
    /// an empty store plus a `RecoverableWarning`.
    fn load(&self) -> LoadedProgress;

    /// Replace saved progress with `store`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be written. Previously saved
    /// state is left intact in that case.
    fn save(&self, store: &ProgressStore) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryProgressRepository {
    saved: Arc<Mutex<Option<ProgressStore>>>,
    saves: Arc<Mutex<usize>>,
    fail_saves: bool,
}

impl InMemoryProgressRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `store` already saved.
    #[must_use]
    pub fn with_store(store: ProgressStore) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Some(store))),
            ..Self::default()
        }
    }

    /// Make every `save` fail, to exercise write-failure handling.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    /// Last successfully saved store, if any.
    #[must_use]
    pub fn saved(&self) -> Option<ProgressStore> {
        self.saved.lock().ok().and_then(|guard| guard.clone())
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.lock().map_or(0, |guard| *guard)
    }
}

impl ProgressRepository for InMemoryProgressRepository {
    fn load(&self) -> LoadedProgress {
        match self.saved.lock() {
            Ok(guard) => LoadedProgress {
                store: guard.clone().unwrap_or_default(),
                warning: None,
            },
            Err(e) => LoadedProgress::recovered(e.to_string(), None),
        }
    }

    fn save(&self, store: &ProgressStore) -> Result<(), StorageError> {
        if self.fail_saves {
            return Err(StorageError::Unavailable("saves disabled".into()));
        }
        let mut guard = self
            .saved
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *guard = Some(store.clone());
        let mut saves = self
            .saves
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *saves += 1;
        Ok(())
    }
}

//! JSON file-backed progress repository.

mod mapping;

use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use quiz_core::model::ProgressStore;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::repository::{LoadedProgress, ProgressRepository, StorageError};
use mapping::ProgressDocument;

/// Progress kept in a single JSON document on disk.
///
/// Saves write a sibling temporary file, fsync it, and rename it over the
/// target, so a crash leaves either the old or the new document in place.
#[derive(Debug, Clone)]
pub struct FileProgressRepository {
    path: PathBuf,
}

impl FileProgressRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn read(&self) -> Result<ProgressStore, StorageError> {
        let content = fs::read_to_string(&self.path)?;
        let doc: ProgressDocument = serde_json::from_str(&content)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        doc.into_store()
    }
}

impl ProgressRepository for FileProgressRepository {
    fn load(&self) -> LoadedProgress {
        match self.read() {
            Ok(store) => {
                info!(path = %self.path.display(), "loaded progress");
                LoadedProgress {
                    store,
                    warning: None,
                }
            }
            Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no saved progress, starting fresh");
                LoadedProgress::fresh()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable progress");
                LoadedProgress::recovered(e.to_string(), Some(self.path.clone()))
            }
        }
    }

    fn save(&self, store: &ProgressStore) -> Result<(), StorageError> {
        let dir = self.parent_dir();
        fs::create_dir_all(&dir)?;

        let doc = ProgressDocument::from_store(store);
        let tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &doc)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;

        debug!(path = %self.path.display(), records = doc.records.len(), "saved progress");
        Ok(())
    }
}

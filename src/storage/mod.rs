mod local_store;
mod remote_store;
mod selector;

pub use local_store::{LocalNotesStore, STORAGE_KEY};
pub use remote_store::{RemoteNotesStore, NOTE_COLUMNS, NOT_FOUND_CODE, TABLE_NAME};
pub use selector::{select_backend, BackendSelector};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entity::{Note, NoteDraft, NotePatch};
use crate::error::StorageResult;

/// Which persistence backend is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Remote,
    Local,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Remote => write!(f, "remote"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

/// Uniform CRUD contract over note records.
///
/// Both implementations keep `list` sorted by `updated_at` descending and
/// report failures as [`crate::StorageError`].
#[async_trait]
pub trait NotesBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// All notes, most recently updated first.
    async fn list(&self) -> StorageResult<Vec<Note>>;

    /// A note by id, or `None` when it does not exist.
    async fn get(&self, id: &str) -> StorageResult<Option<Note>>;

    /// Store a new note under a fresh id and timestamp.
    async fn create(&self, draft: NoteDraft) -> StorageResult<Note>;

    /// Merge `patch` into an existing note and refresh its timestamp.
    async fn update(&self, id: &str, patch: NotePatch) -> StorageResult<Note>;

    /// Delete a note. Removing an unknown id is not an error.
    async fn remove(&self, id: &str) -> StorageResult<()>;
}

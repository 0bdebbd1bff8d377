use thiserror::Error;

/// Errors raised by a storage adapter. This is the only error kind the
/// state store surfaces to its consumers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Note not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed storage data: {0}")]
    Malformed(String),

    #[error("Write rejected: {0}")]
    WriteRejected(String),

    /// Error reported by the remote table API, message preserved verbatim.
    #[error("{message}")]
    Remote {
        message: String,
        code: Option<String>,
    },
}

impl StorageError {
    /// The message text shown in the error banner.
    pub fn message(&self) -> String {
        match self {
            StorageError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Malformed(err.to_string())
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StorageError::Malformed(err.to_string())
        } else {
            StorageError::Unavailable(err.to_string())
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum NotesError {
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Ambiguous note id '{0}': matches more than one note")]
    AmbiguousId(String),

    /// An error already surfaced through the error banner, carried as its display text.
    #[error("{0}")]
    Reported(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NotesError>;

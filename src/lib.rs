pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod markdown;
pub mod server;
pub mod state;
pub mod storage;
pub mod ui;

pub use config::{BackendConfig, NotesConfig};
pub use entity::{Note, NoteDraft, NotePatch};
pub use error::{NotesError, Result, StorageError, StorageResult};
pub use state::{NotesSnapshot, NotesState};
pub use storage::{select_backend, BackendKind, BackendSelector, NotesBackend};

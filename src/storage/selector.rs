use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{LocalNotesStore, NotesBackend, RemoteNotesStore};
use crate::config::BackendConfig;

/// Choose a backend: remote when both settings are present and a client can
/// be built, local otherwise.
pub fn select_backend(config: &BackendConfig, data_dir: &Path) -> Arc<dyn NotesBackend> {
    if let Some((url, key)) = config.remote_settings() {
        match RemoteNotesStore::connect(&url, key, config.timeout()) {
            Ok(store) => {
                tracing::info!(url = %store.table_url(), "using remote notes backend");
                return Arc::new(store);
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote backend unavailable, falling back to local storage");
            }
        }
    } else if config.remote_url.is_some() || config.remote_key.is_some() {
        tracing::warn!("remote backend settings incomplete or invalid, using local storage");
    }

    tracing::info!(dir = %data_dir.display(), "using local notes backend");
    Arc::new(LocalNotesStore::open(data_dir))
}

/// Re-runnable backend selection for one session.
///
/// Once remote is disabled, `select` only ever yields the local backend.
#[derive(Debug, Clone)]
pub struct BackendSelector {
    config: BackendConfig,
    data_dir: PathBuf,
    remote_disabled: bool,
}

impl BackendSelector {
    pub fn new(config: BackendConfig, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            data_dir: data_dir.into(),
            remote_disabled: false,
        }
    }

    pub fn select(&self) -> Arc<dyn NotesBackend> {
        if self.remote_disabled {
            return select_backend(&BackendConfig::local_only(), &self.data_dir);
        }
        select_backend(&self.config, &self.data_dir)
    }

    /// Mark the remote backend unusable for the rest of the session.
    pub fn disable_remote(&mut self) {
        self.remote_disabled = true;
    }

    pub fn is_remote_disabled(&self) -> bool {
        self.remote_disabled
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

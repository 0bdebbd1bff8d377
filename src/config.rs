//! Runtime configuration.
//!
//! Values come from the environment (optionally seeded from a `.env` file)
//! or from CLI flags that mirror the same variable names.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;

pub const ENV_REMOTE_URL: &str = "OCEAN_NOTES_REMOTE_URL";
pub const ENV_REMOTE_KEY: &str = "OCEAN_NOTES_REMOTE_KEY";
pub const ENV_DATA_DIR: &str = "OCEAN_NOTES_DATA_DIR";
pub const ENV_REMOTE_TIMEOUT_MS: &str = "OCEAN_NOTES_REMOTE_TIMEOUT_MS";

/// Directory name searched for when no data dir is configured.
pub const DATA_DIR_NAME: &str = ".ocean-notes";

pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 10_000;

/// Settings that decide which storage backend is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    pub remote_url: Option<String>,
    pub remote_key: Option<String>,
    pub remote_timeout: Option<Duration>,
}

impl BackendConfig {
    pub fn local_only() -> Self {
        Self::default()
    }

    pub fn remote(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            remote_url: Some(url.into()),
            remote_key: Some(key.into()),
            remote_timeout: None,
        }
    }

    /// Read the backend settings from the process environment.
    pub fn from_env() -> Self {
        Self {
            remote_url: non_blank(env::var(ENV_REMOTE_URL).ok()),
            remote_key: non_blank(env::var(ENV_REMOTE_KEY).ok()),
            remote_timeout: env::var(ENV_REMOTE_TIMEOUT_MS)
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis),
        }
    }

    /// Remote endpoint and key, if both are present and the URL is a valid http(s) URL.
    pub fn remote_settings(&self) -> Option<(Url, &str)> {
        let url = self.remote_url.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let key = self.remote_key.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let url = Url::parse(url).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        Some((url, key))
    }

    pub fn timeout(&self) -> Duration {
        self.remote_timeout
            .unwrap_or(Duration::from_millis(DEFAULT_REMOTE_TIMEOUT_MS))
    }
}

/// Full client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesConfig {
    pub backend: BackendConfig,
    pub data_dir: PathBuf,
}

impl NotesConfig {
    pub fn new(backend: BackendConfig, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            data_dir: data_dir.into(),
        }
    }

    /// Load `.env` if present, then build the config from the environment.
    pub fn load() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to read .env file");
            }
        }

        let data_dir = non_blank(env::var(ENV_DATA_DIR).ok())
            .map(PathBuf::from)
            .unwrap_or_else(find_data_dir);

        Self::new(BackendConfig::from_env(), data_dir)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Find the data directory by looking for `.ocean-notes/` in the current
/// directory or any ancestor, defaulting to `./.ocean-notes`.
pub fn find_data_dir() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_data_dir_from(&cwd)
}

fn find_data_dir_from(start: &Path) -> PathBuf {
    let mut current = start;
    loop {
        let candidate = current.join(DATA_DIR_NAME);
        if candidate.is_dir() {
            return candidate;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return start.join(DATA_DIR_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remote_settings_require_both_values() {
        assert!(BackendConfig::local_only().remote_settings().is_none());

        let only_url = BackendConfig {
            remote_url: Some("https://example.supabase.co".to_string()),
            ..Default::default()
        };
        assert!(only_url.remote_settings().is_none());

        let both = BackendConfig::remote("https://example.supabase.co", "anon-key");
        let (url, key) = both.remote_settings().unwrap();
        assert_eq!(url.host_str(), Some("example.supabase.co"));
        assert_eq!(key, "anon-key");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(BackendConfig::remote("not a url", "k").remote_settings().is_none());
        assert!(BackendConfig::remote("ftp://host", "k").remote_settings().is_none());
        assert!(BackendConfig::remote("https://host", "  ").remote_settings().is_none());
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(
            BackendConfig::local_only().timeout(),
            Duration::from_millis(DEFAULT_REMOTE_TIMEOUT_MS)
        );
    }

    #[test]
    fn test_find_data_dir_walks_up() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join(DATA_DIR_NAME)).unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_data_dir_from(&nested), tmp.path().join(DATA_DIR_NAME));
    }

    #[test]
    fn test_find_data_dir_defaults_to_start() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_data_dir_from(tmp.path()), tmp.path().join(DATA_DIR_NAME));
    }
}

//! The single current-error banner.
//!
//! Only one error is kept at a time; setting a new one replaces the old.

use serde::{Deserialize, Serialize};

/// How the error came about, which decides its framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    /// The remote backend failed and the session switched to local storage.
    RemoteFallback,
    /// Any other storage failure.
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBanner {
    pub kind: BannerKind,
    pub message: String,
}

impl ErrorBanner {
    pub fn remote_fallback(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::RemoteFallback,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Storage,
            message: message.into(),
        }
    }
}

/// Format a banner for display.
pub fn format_banner(banner: &ErrorBanner) -> String {
    match banner.kind {
        BannerKind::RemoteFallback => format!(
            "Remote backend error: {}. Switched to local storage for this session.",
            banner.message
        ),
        BannerKind::Storage => format!("Storage error: {}", banner.message),
    }
}

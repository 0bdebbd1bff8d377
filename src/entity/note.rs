// src/entity/note.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Untitled";

/// Prefix of ids handed out by the state store before the backend confirms a note.
pub const PLACEHOLDER_PREFIX: &str = "opt-";

/// A single note record. Serialized with exactly the four persisted fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Build a fresh confirmed note with a random UUID id.
    pub fn new(draft: NoteDraft, updated_at: DateTime<Utc>) -> Self {
        let draft = draft.normalized();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: draft.title,
            content: draft.content,
            updated_at,
        }
    }

    /// Whether this note is still waiting for the backend to assign its id.
    pub fn is_pending(&self) -> bool {
        is_placeholder_id(&self.id)
    }

    /// Title for display, falling back to the default for blank titles.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            &self.title
        }
    }
}

/// Input to `create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Apply the defaults: an empty title becomes "Untitled".
    pub fn normalized(self) -> Self {
        let title = if self.title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            self.title
        };
        Self {
            title,
            content: self.content,
        }
    }
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }

    /// Merge the present fields into `note`. Does not touch `updated_at`.
    pub fn apply_to(&self, note: &mut Note) {
        if let Some(ref title) = self.title {
            note.title = title.clone();
        }
        if let Some(ref content) = self.content {
            note.content = content.clone();
        }
    }

    /// Coalesce with a later patch; fields present in `later` win.
    pub fn merge(self, later: NotePatch) -> NotePatch {
        NotePatch {
            title: later.title.or(self.title),
            content: later.content.or(self.content),
        }
    }
}

pub fn is_placeholder_id(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_PREFIX)
}

/// Placeholder id for a pending note. `seq` keeps ids unique within one millisecond.
pub fn placeholder_id(now: DateTime<Utc>, seq: u64) -> String {
    format!("{}{}-{}", PLACEHOLDER_PREFIX, now.timestamp_millis(), seq)
}

/// Stable sort, most recently updated first.
pub fn sort_newest_first(notes: &mut [Note]) {
    notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

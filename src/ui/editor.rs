//! Note editor.
//!
//! Keeps a per-keystroke buffer for the selected note and commits it to the
//! state store through a debounce, so a burst of edits becomes one update.

use std::time::Duration;

use super::debounce::Debouncer;
use crate::entity::{Note, NotePatch};
use crate::markdown;
use crate::state::NotesState;

pub const EDIT_DEBOUNCE: Duration = Duration::from_millis(250);
pub const NO_SELECTION_TEXT: &str = "Select or create a note to begin.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Edit,
    Preview,
}

/// Editable copy of a note's fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    pub title: String,
    pub content: String,
}

impl EditBuffer {
    fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
        }
    }

    fn to_patch(&self) -> NotePatch {
        NotePatch {
            title: Some(self.title.clone()),
            content: Some(self.content.clone()),
        }
    }
}

pub struct EditorSession {
    state: NotesState,
    note_id: Option<String>,
    buffer: EditBuffer,
    mode: EditorMode,
    debouncer: Debouncer,
}

impl EditorSession {
    pub fn new(state: NotesState) -> Self {
        Self::with_delay(state, EDIT_DEBOUNCE)
    }

    pub fn with_delay(state: NotesState, delay: Duration) -> Self {
        Self {
            state,
            note_id: None,
            buffer: EditBuffer::default(),
            mode: EditorMode::default(),
            debouncer: Debouncer::new(delay),
        }
    }

    pub fn note_id(&self) -> Option<&str> {
        self.note_id.as_deref()
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    /// Follow the store's selection. The buffer is reloaded only when the
    /// selected note changes; pending edits to the previous note are flushed first.
    pub async fn sync(&mut self) {
        let selected = self.state.selected_note().await;
        let selected_id = selected.as_ref().map(|n| n.id.clone());

        if selected_id == self.note_id {
            return;
        }

        // A confirmed create swaps the placeholder id; keep the buffer.
        if let (Some(old), Some(new)) = (&self.note_id, &selected_id) {
            if self.state.resolve_id(old).await.ok().as_ref() == Some(new) {
                self.note_id = selected_id;
                return;
            }
        }

        self.flush().await;
        self.buffer = selected.as_ref().map(EditBuffer::from_note).unwrap_or_default();
        self.note_id = selected_id;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.buffer.title = title.into();
        self.schedule();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.buffer.content = content.into();
        self.schedule();
    }

    /// Append a line to the content.
    pub fn append_line(&mut self, line: &str) {
        if !self.buffer.content.is_empty() && !self.buffer.content.ends_with('\n') {
            self.buffer.content.push('\n');
        }
        self.buffer.content.push_str(line);
        self.schedule();
    }

    fn schedule(&mut self) {
        let Some(id) = self.note_id.clone() else {
            return;
        };
        let state = self.state.clone();
        let patch = self.buffer.to_patch();
        self.debouncer.call(async move {
            state.update_note(&id, patch).await;
        });
    }

    /// Commit pending edits now instead of waiting for the debounce.
    pub async fn flush(&mut self) -> Option<Note> {
        let waiting = self.debouncer.cancel();
        let id = self.note_id.clone()?;
        if !waiting {
            self.debouncer.idle().await;
            return None;
        }
        self.state.update_note(&id, self.buffer.to_patch()).await
    }

    /// Wait for any armed commit to fire and finish.
    pub async fn settle(&self) {
        self.debouncer.idle().await;
    }

    pub fn preview_html(&self) -> String {
        markdown::render(&self.buffer.content)
    }

    /// Text view of the editor in its current mode.
    pub fn render(&self) -> String {
        if self.note_id.is_none() {
            return format!("{}\n", NO_SELECTION_TEXT);
        }

        let mode = match self.mode {
            EditorMode::Edit => "[Edit] Preview",
            EditorMode::Preview => "Edit [Preview]",
        };
        let body = match self.mode {
            EditorMode::Edit => self.buffer.content.clone(),
            EditorMode::Preview => self.preview_html(),
        };

        let title = if self.buffer.title.is_empty() {
            "(untitled)"
        } else {
            &self.buffer.title
        };
        format!("# {}\n{}\n\n{}\n", title, mode, body.trim_end())
    }
}

//! Notes list view.

use crate::entity::Note;

pub const SNIPPET_LEN: usize = 80;
pub const LIST_HEADER: &str = "Your Notes";
pub const LOADING_TEXT: &str = "Loading...";
pub const EMPTY_TEXT: &str = "No notes yet. Use \"new\" to create one.";

/// Single-line preview of note content.
pub fn snippet(content: &str) -> String {
    content.replace('\n', " ").chars().take(SNIPPET_LEN).collect()
}

/// Placeholder text shown when the list has no rows.
pub fn empty_text(loading: bool) -> &'static str {
    if loading {
        LOADING_TEXT
    } else {
        EMPTY_TEXT
    }
}

/// Short form of an id for display.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Render the list with the selected row marked.
pub fn render_list(notes: &[Note], selected_id: Option<&str>, empty_text: &str) -> String {
    let mut out = String::new();
    out.push_str(LIST_HEADER);
    out.push('\n');

    if notes.is_empty() {
        out.push_str("  ");
        out.push_str(empty_text);
        out.push('\n');
        return out;
    }

    for note in notes {
        let marker = if selected_id == Some(note.id.as_str()) {
            '>'
        } else {
            ' '
        };
        let pending = if note.is_pending() { " (saving)" } else { "" };
        out.push_str(&format!(
            "{} {}  {}{}\n",
            marker,
            short_id(&note.id),
            note.display_title(),
            pending
        ));

        let preview = snippet(&note.content);
        if !preview.trim().is_empty() {
            out.push_str(&format!("    {}\n", preview));
        }
    }

    out
}

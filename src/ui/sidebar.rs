//! Search box and list filtering.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::debounce::Debouncer;
use crate::entity::Note;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Notes whose title or content contains `query`, case-insensitively.
/// A blank query matches everything.
pub fn filter_notes<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return notes.iter().collect();
    }
    notes
        .iter()
        .filter(|n| {
            n.title.to_lowercase().contains(&query) || n.content.to_lowercase().contains(&query)
        })
        .collect()
}

/// Search input whose value is applied after typing pauses.
pub struct SearchBox {
    debouncer: Debouncer,
    applied: Arc<watch::Sender<String>>,
}

impl Default for SearchBox {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl SearchBox {
    pub fn new(delay: Duration) -> Self {
        let (applied, _) = watch::channel(String::new());
        Self {
            debouncer: Debouncer::new(delay),
            applied: Arc::new(applied),
        }
    }

    /// Record typed text; it becomes the applied query once input pauses.
    pub fn input(&mut self, text: impl Into<String>) {
        let text = text.into();
        let applied = self.applied.clone();
        self.debouncer.call(async move {
            applied.send_replace(text);
        });
    }

    /// Apply `text` immediately, dropping any pending input.
    pub fn submit(&mut self, text: impl Into<String>) {
        self.debouncer.cancel();
        self.applied.send_replace(text.into());
    }

    /// The query currently in effect.
    pub fn query(&self) -> String {
        self.applied.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.applied.subscribe()
    }

    /// Wait for pending input to be applied.
    pub async fn settle(&self) {
        self.debouncer.idle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn note(title: &str, content: &str) -> Note {
        Note {
            id: title.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_filter_matches_title_or_content() {
        let notes = vec![
            note("Groceries", "milk, eggs"),
            note("Ideas", "Write a RUST crate"),
            note("Travel", "pack bags"),
        ];

        let hits: Vec<_> = filter_notes(&notes, "rust").iter().map(|n| n.title.as_str()).collect();
        assert_eq!(hits, vec!["Ideas"]);

        let hits: Vec<_> = filter_notes(&notes, "  GROC ").iter().map(|n| n.title.as_str()).collect();
        assert_eq!(hits, vec!["Groceries"]);
    }

    #[test]
    fn test_blank_query_matches_all() {
        let notes = vec![note("a", ""), note("b", "")];
        assert_eq!(filter_notes(&notes, "   ").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_applies_after_pause() {
        let mut search = SearchBox::default();
        search.input("gro");
        search.input("groc");
        assert_eq!(search.query(), "");

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(search.query(), "groc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_is_immediate() {
        let mut search = SearchBox::default();
        search.input("typed");
        search.submit("entered");
        assert_eq!(search.query(), "entered");

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(search.query(), "entered");
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_applies_pending_input() {
        let mut search = SearchBox::default();
        let mut rx = search.subscribe();
        search.input("ideas");
        search.settle().await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "ideas");
    }
}

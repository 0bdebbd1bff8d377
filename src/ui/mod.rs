//! Presentation layer: view-models for the list, editor, sidebar and header.
//!
//! Nothing here owns note data; views render from a [`crate::state::NotesState`]
//! snapshot and send edits back to it.

pub mod banner;
pub mod debounce;
pub mod editor;
pub mod header;
pub mod list;
pub mod sidebar;

pub use banner::{format_banner, BannerKind, ErrorBanner};
pub use debounce::Debouncer;
pub use editor::{EditorMode, EditorSession};
pub use sidebar::{filter_notes, SearchBox};

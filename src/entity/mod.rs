mod note;

pub use note::{
    is_placeholder_id, placeholder_id, sort_newest_first, Note, NoteDraft, NotePatch,
    DEFAULT_TITLE, PLACEHOLDER_PREFIX,
};

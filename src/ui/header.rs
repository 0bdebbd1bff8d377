use crate::storage::BackendKind;

pub const APP_TITLE: &str = "Personal Notes";
pub const SHORTCUT_TIP: &str = "Tip: type \"help\" for commands, \"/text\" to search";

pub fn badge_label(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Remote => "Remote",
        BackendKind::Local => "Local",
    }
}

pub fn badge_description(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Remote => "Using remote persistence",
        BackendKind::Local => "Using local storage persistence",
    }
}

/// Title line with the persistence badge.
pub fn render_header(kind: BackendKind) -> String {
    format!("{} [{}]", APP_TITLE, badge_label(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_shows_backend() {
        assert_eq!(render_header(BackendKind::Local), "Personal Notes [Local]");
        assert_eq!(render_header(BackendKind::Remote), "Personal Notes [Remote]");
    }

    #[test]
    fn test_badge_description() {
        assert!(badge_description(BackendKind::Remote).contains("remote"));
        assert!(badge_description(BackendKind::Local).contains("local"));
    }
}

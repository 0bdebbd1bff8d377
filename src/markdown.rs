//! Markdown preview rendering.
//!
//! Raw HTML in a note is never passed through: it is emitted as escaped
//! text, so the preview output only contains markup produced by the
//! markdown renderer itself.

use pulldown_cmark::{html, Event, Options, Parser};

/// Render note content to an HTML fragment.
pub fn render(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut body = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut body, parser);
    body
}

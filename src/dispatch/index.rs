//! Development index pages listing what is mounted where.

use std::fmt::Write;

pub(crate) struct IndexEntry {
    pub(crate) label: String,
    pub(crate) href: String,
}

pub(crate) fn render(title: &str, entries: &[IndexEntry]) -> String {
    let mut html = format!(
        "<!doctype html><html><head><title>{0}</title></head><body><h1>{0}</h1><ul>",
        escape(title)
    );
    for entry in entries {
        let _ = write!(
            html,
            "<li>{} <a href=\".{}\">{}</a></li>",
            escape(&entry.label),
            escape(&entry.href),
            escape(&entry.href)
        );
    }
    html.push_str("</ul></body></html>");
    html
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

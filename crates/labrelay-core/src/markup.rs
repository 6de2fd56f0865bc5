//! Message formatting helpers shared by chat replies and webhook notifications.
//!
//! Messages are rendered as HTML for Matrix' `org.matrix.custom.html` format;
//! every value that comes from GitLab or from a user goes through
//! [`escape_html`] before it is interpolated.

use std::sync::OnceLock;

use regex::Regex;

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Derive the plain-text body that accompanies an HTML message.
///
/// `<br/>` and list items become line breaks, all other tags are dropped and
/// the entities produced by [`escape_html`] are decoded.
pub fn html_to_plain(html: &str) -> String {
    static BREAK: OnceLock<Regex> = OnceLock::new();
    static ITEM: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();
    let brk = BREAK.get_or_init(|| Regex::new(r"(?i)<br\s*/?>\n?").expect("static regex"));
    let item = ITEM.get_or_init(|| Regex::new(r"(?i)<li>").expect("static regex"));
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"));

    let text = brk.replace_all(html, "\n");
    let text = item.replace_all(&text, "\n* ");
    let text = tag.replace_all(&text, "");
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// `"1 commit"`, `"3 commits"`.
pub fn pluralize(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Join names into an English list: `A`, `A and B`, `A, B, and C`.
pub fn join_names<S: AsRef<str>>(names: &[S]) -> String {
    match names {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} and {}", first.as_ref(), second.as_ref()),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(|name| name.as_ref()).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}

/// Human readable duration: `"1 hour, 2 minutes and 5 seconds"`.
pub fn format_duration(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = total_seconds % 86_400 / 3_600;
    let minutes = total_seconds % 3_600 / 60;
    let seconds = total_seconds % 60;

    let parts: Vec<String> = [(days, "day"), (hours, "hour"), (minutes, "minute"), (seconds, "second")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| pluralize(value, unit))
        .collect();

    match parts.as_slice() {
        [] => pluralize(0, "second"),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// First line of a commit or issue message, and whether any non-blank
/// text follows it.
pub fn first_line(message: &str) -> (&str, bool) {
    let message = message.trim();
    match message.split_once('\n') {
        Some((first, rest)) => (first.trim_end_matches('\r'), !rest.trim().is_empty()),
        None => (message, false),
    }
}

/// Cut `s` to at most `max` characters, appending `…` when anything was removed.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

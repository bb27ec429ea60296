//! Text helpers for unit content.
//!
//! Content arrives as light HTML from the rich editor (`<p>` paragraphs and
//! `<br>` breaks) or as plain text from the screenplay editor.

use std::sync::OnceLock;

use regex::Regex;

/// Count characters the way the backend does: drop paragraph and break
/// markup, turn `&nbsp;` into a space, trim, then count Unicode scalars.
pub fn count_words(content: &str) -> u32 {
    let text = content
        .replace("<p>", "")
        .replace("</p>", "")
        .replace("<br>", "")
        .replace("<br/>", "")
        .replace("&nbsp;", " ");
    text.trim().chars().count() as u32
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("static tag pattern"))
}

/// Strip markup for terminal display, keeping paragraph breaks
pub fn strip_html(content: &str) -> String {
    let text = content
        .replace("</p>", "\n")
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("&nbsp;", " ");
    let text = tag_regex().replace_all(&text, "");
    text.trim_end().to_string()
}

/// Wrap plain text as editor paragraphs
pub fn paragraphs_to_html(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("<p>{}</p>", line.trim_end()))
        .collect()
}

/// Thousands separators: 1234567 -> "1,234,567"
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{}m", minutes);
    }
    let hours = minutes / 60;
    let mins = minutes % 60;
    if mins > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}h", hours)
    }
}

/// Truncate on a character boundary, appending "..."
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

use jugo_lib::content::text::strip_html;
use jugo_lib::editor::{EditorStatus, Notice, NoticeLevel};

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

pub fn rule(width: usize) -> String {
    "\u{2500}".repeat(width)
}

/// Unit content as wrapped terminal paragraphs
pub fn render_content(content: &str, width: usize) -> String {
    let text = strip_html(content);
    let mut lines = Vec::new();
    for paragraph in text.lines().filter(|l| !l.trim().is_empty()) {
        lines.extend(wrap_lines(paragraph.trim(), "", width));
        lines.push(String::new());
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

pub fn render_notice(notice: &Notice, use_color: bool) -> String {
    match notice.level {
        NoticeLevel::Success => paint(&format!("\u{2713} {}", notice.message), Color::GREEN, use_color),
        NoticeLevel::Error => paint(&format!("\u{2717} {}", notice.message), Color::RED, use_color),
    }
}

pub fn render_status<U>(status: &EditorStatus<U>) -> String {
    let state = if status.is_saving {
        "saving"
    } else if status.has_unsaved_changes {
        "unsaved changes"
    } else {
        "saved"
    };
    match status.last_saved_at {
        Some(at) => format!("[{}, last saved {}]", state, at.with_timezone(&chrono::Local).format("%H:%M:%S")),
        None => format!("[{}]", state),
    }
}

fn wrap_lines(text: &str, prefix: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let effective_width = max_width.saturating_sub(prefix.chars().count());

    for line in text.lines() {
        if line.chars().count() <= effective_width {
            lines.push(format!("{}{}", prefix, line));
            continue;
        }
        let mut current_line = String::new();
        for word in line.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.chars().count() + 1 + word.chars().count() <= effective_width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(format!("{}{}", prefix, current_line));
                current_line = word.to_string();
            }
        }
        if !current_line.is_empty() {
            lines.push(format!("{}{}", prefix, current_line));
        }
    }

    lines
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Bordered panels and tables for chat output.
//!
//! Panels and tables render to a `String`; the `print` helpers size them to
//! the current terminal width.

use colored::{Color, Colorize};
use crossterm::terminal;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::client::{self, ModelInfo, Usage};
use crate::commands::COMMANDS;
use crate::conversation::{Message, Role};

const MIN_WIDTH: usize = 24;
const MAX_WIDTH: usize = 120;
const HISTORY_PREVIEW_CHARS: usize = 60;

pub(crate) fn terminal_width() -> usize {
    let cols = terminal::size().map(|(cols, _)| cols as usize).unwrap_or(80);
    cols.clamp(MIN_WIDTH, MAX_WIDTH)
}

fn terminal_rows() -> usize {
    terminal::size().map(|(_, rows)| rows as usize).unwrap_or(24)
}

fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Word-wrap `text` to `width` columns. Newlines are kept; words longer than
/// a line are split.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for source_line in text.split('\n') {
        let source_line = source_line.trim_end_matches('\r');
        let mut line = String::new();
        let mut line_width = 0;

        for word in source_line.split(' ') {
            let word_width = display_width(word);
            let sep = usize::from(line_width > 0);

            if line_width + sep + word_width <= width {
                if sep == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                line_width += sep + word_width;
                continue;
            }
            if line_width > 0 {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
            }
            if word_width <= width {
                line.push_str(word);
                line_width = word_width;
                continue;
            }
            for c in word.chars() {
                let w = c.width().unwrap_or(0);
                if line_width + w > width && line_width > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0;
                }
                line.push(c);
                line_width += w;
            }
        }
        lines.push(line);
    }
    lines
}

fn truncate(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let mut cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

fn pad_to(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(text));
    format!("{text}{}", " ".repeat(fill))
}

/// A rounded box with a title, wrapped body and optional subtitle.
#[derive(Debug, Clone)]
pub(crate) struct Panel {
    title: String,
    body: String,
    color: Color,
    subtitle: Option<String>,
    /// Keep only the last `n` body lines.
    max_lines: Option<usize>,
}

impl Panel {
    pub(crate) fn new(title: impl Into<String>, body: impl Into<String>, color: Color) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            color,
            subtitle: None,
            max_lines: None,
        }
    }

    pub(crate) fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub(crate) fn max_lines(mut self, lines: usize) -> Self {
        self.max_lines = Some(lines);
        self
    }

    pub(crate) fn render(&self, width: usize) -> String {
        let width = width.max(MIN_WIDTH);
        let inner = width - 4;

        let mut lines = wrap_text(self.body.trim_end(), inner);
        if let Some(max) = self.max_lines
            && lines.len() > max
        {
            let hidden = lines.len() - max + 1;
            lines.drain(..hidden);
            lines.insert(0, format!("... {hidden} earlier lines"));
        }

        let mut out = String::new();
        out.push_str(&border_top(&self.title, width, self.color));
        out.push('\n');
        let side = "│".color(self.color);
        for line in &lines {
            out.push_str(&format!("{side} {} {side}\n", pad_to(line, inner)));
        }
        out.push_str(&border_bottom(self.subtitle.as_deref(), width, self.color));
        out.push('\n');
        out
    }

    pub(crate) fn print(&self) {
        print!("{}", self.render(terminal_width()));
    }
}

fn border_top(title: &str, width: usize, color: Color) -> String {
    let label = format!(" {title} ");
    let fill = width.saturating_sub(display_width(&label) + 3);
    format!(
        "{}{}{}",
        "╭─".color(color),
        label.color(color).bold(),
        format!("{}╮", "─".repeat(fill)).color(color)
    )
}

fn border_bottom(subtitle: Option<&str>, width: usize, color: Color) -> String {
    match subtitle {
        Some(text) => {
            let label = format!(" {text} ");
            let fill = width.saturating_sub(display_width(&label) + 3);
            format!(
                "{}{}{}",
                format!("╰{}", "─".repeat(fill)).color(color),
                label.dimmed(),
                "─╯".color(color)
            )
        }
        None => format!("╰{}╯", "─".repeat(width.saturating_sub(2)))
            .color(color)
            .to_string(),
    }
}

/// The top edge of a panel whose body is streamed in afterwards.
pub(crate) fn stream_header(title: &str, color: Color) -> String {
    border_top(title, terminal_width(), color)
}

pub(crate) fn stream_footer(subtitle: Option<&str>, color: Color) -> String {
    border_bottom(subtitle, terminal_width(), color)
}

pub(crate) fn response_panel(content: &str, model: &str) -> Panel {
    Panel::new("Response", content, Color::Cyan).subtitle(model)
}

/// Reasoning keeps only its most recent lines.
pub(crate) fn reasoning_panel(reasoning: &str) -> Panel {
    let max = (terminal_rows() / 4).max(10);
    Panel::new("Reasoning", reasoning, Color::Magenta).max_lines(max)
}

pub(crate) fn error_panel(message: &str) -> Panel {
    Panel::new("Error", message, Color::Red)
}

pub(crate) fn info_panel(message: &str) -> Panel {
    Panel::new("Info", message, Color::Blue)
}

pub(crate) fn usage_panel(usage: &Usage) -> Panel {
    let body = format!(
        "Prompt tokens: {}   Completion tokens: {}   Total: {}",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
    );
    Panel::new("Usage", body, Color::BrightBlack)
}

pub(crate) fn tools_panel(count: usize) -> Panel {
    let noun = if count == 1 { "tool" } else { "tools" };
    Panel::new(
        "Tools Executed",
        format!("The model ran {count} {noun} to answer this request."),
        Color::Yellow,
    )
}

pub(crate) fn compound_panel(model: &ModelInfo) -> Panel {
    let body = format!(
        "{} can search the web and execute code while answering.\n\
         Responses arrive all at once rather than streamed.",
        model.name
    );
    Panel::new("Enhanced AI Capabilities", body, Color::Green)
}

/// A plain column table with a header row.
#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    title: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub(crate) fn new(title: &str, headers: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| display_width(h)).collect();
        for row in &self.rows {
            for (idx, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(idx) {
                    *w = (*w).max(display_width(cell));
                }
            }
        }
        widths
    }

    pub(crate) fn render(&self) -> String {
        let widths = self.column_widths();
        let format_row = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| pad_to(cell, *w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = format!("{}\n", self.title.bold());
        out.push_str(&format!("{}\n", format_row(self.headers.as_slice()).cyan().bold()));
        let rule: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        out.push_str(&format!("{}\n", "─".repeat(rule).bright_black()));
        for row in &self.rows {
            out.push_str(&format_row(row.as_slice()));
            out.push('\n');
        }
        out
    }

    pub(crate) fn print(&self) {
        print!("{}", self.render());
    }
}

pub(crate) fn history_table(messages: &[Message]) -> Table {
    let mut table = Table::new("Conversation History", &["#", "Role", "Time", "Content"]);
    for (idx, message) in messages.iter().enumerate() {
        let role = match message.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
            Role::System => "System",
        };
        table.row(vec![
            (idx + 1).to_string(),
            role.to_string(),
            message.timestamp.format("%H:%M:%S").to_string(),
            truncate(&message.content, HISTORY_PREVIEW_CHARS),
        ]);
    }
    table
}

pub(crate) fn help_table() -> Table {
    let mut table = Table::new("Commands", &["Command", "Description"]);
    for spec in COMMANDS {
        table.row(vec![spec.usage.to_string(), spec.description.to_string()]);
    }
    table
}

pub(crate) fn models_table(current: &str) -> Table {
    let mut table = Table::new(
        "Models",
        &["", "Model", "Name", "Streaming", "Tools", "Reasoning", "Max tokens", "Description"],
    );
    for model in client::MODELS {
        let yes_no = |flag: bool| String::from(if flag { "yes" } else { "no" });
        table.row(vec![
            String::from(if model.id == current { "*" } else { "" }),
            model.id.to_string(),
            model.name.to_string(),
            yes_no(model.supports_streaming),
            yes_no(model.supports_tools),
            yes_no(model.supports_reasoning),
            model.max_tokens.to_string(),
            model.description.to_string(),
        ]);
    }
    table
}

pub(crate) fn config_table(entries: &[(&'static str, String)]) -> Table {
    let mut table = Table::new("Settings", &["Key", "Value"]);
    for (key, value) in entries {
        table.row(vec![key.to_string(), value.clone()]);
    }
    table
}

pub(crate) fn welcome() -> String {
    format!(
        "{}\n{}\n",
        "GPT CLI Enhanced".bold().green(),
        format!(
            "To get started, describe a task or press {} for commands",
            "/".cyan()
        )
        .bright_black()
    )
}

pub(crate) fn status_line(model: &str) -> String {
    format!(
        "{} {}   {} {}",
        "Model:".bright_black(),
        model.cyan(),
        "Mode:".bright_black(),
        "interactive".cyan()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drop SGR escape sequences so layout can be compared as plain text.
    fn strip_ansi(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("hello world", 20), vec!["hello world"]);
        assert_eq!(wrap_text("hello world", 7), vec!["hello", "world"]);
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn test_wrap_wide_characters() {
        // Each CJK character is two columns wide.
        assert_eq!(wrap_text("日本語テキスト", 6), vec!["日本語", "テキス", "ト"]);
    }

    #[test]
    fn test_panel_lines_have_equal_width() {
        let panel = Panel::new("Response", "some text that will need wrapping here", Color::Cyan)
            .subtitle("openai/gpt-oss-20b");
        let rendered = strip_ansi(&panel.render(30));
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines.len() >= 4);
        assert!(lines[0].starts_with("╭─ Response "));
        assert!(lines.last().unwrap().contains("openai/gpt-oss-20b"));
        for line in &lines {
            assert_eq!(display_width(line), 30, "{line:?}");
        }
    }

    #[test]
    fn test_panel_tail_limit() {
        let body = (1..=20).map(|n| n.to_string()).collect::<Vec<_>>().join("\n");
        let rendered = strip_ansi(&Panel::new("Reasoning", body, Color::Magenta).max_lines(5).render(40));
        let lines: Vec<&str> = rendered.lines().collect();
        // Border, marker, four kept lines, border.
        assert_eq!(lines.len(), 7);
        assert!(lines[1].contains("... 16 earlier lines"));
        assert!(lines[2].contains("17"));
        assert!(lines[5].contains("20"));
    }

    #[test]
    fn test_history_table_truncates() {
        let messages = vec![
            Message::new(Role::User, "short"),
            Message::new(Role::Assistant, "x".repeat(200)),
        ];
        let rendered = strip_ansi(&history_table(&messages).render());
        assert!(rendered.contains("You"));
        assert!(rendered.contains(&format!("{}...", "x".repeat(57))));
        assert!(!rendered.contains(&"x".repeat(61)));
    }

    #[test]
    fn test_help_lists_every_command() {
        let rendered = strip_ansi(&help_table().render());
        for spec in COMMANDS {
            assert!(rendered.contains(spec.usage));
        }
    }

    #[test]
    fn test_models_table_marks_current() {
        let rendered = strip_ansi(&models_table("compound-beta").render());
        let line = rendered
            .lines()
            .find(|l| l.contains("compound-beta ") && !l.contains("mini"))
            .unwrap();
        assert!(line.starts_with('*'));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("a\nb   c", 10), "a b c");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}

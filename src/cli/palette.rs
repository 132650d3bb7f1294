// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Command palette opened with `/` on an empty prompt line.

use std::fmt;

use inquire::{InquireError, Select};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PaletteAction {
    /// Run a typed command line, exactly as if the user had entered it.
    Run(&'static str),
    Exit,
}

#[derive(Debug, Clone)]
pub(crate) struct PaletteItem {
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub keybinding: Option<&'static str>,
    pub action: PaletteAction,
}

impl fmt::Display for PaletteItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<26} {}", self.name, self.description)?;
        if let Some(keys) = self.keybinding {
            write!(f, "  ({keys})")?;
        }
        Ok(())
    }
}

const fn item(
    name: &'static str,
    description: &'static str,
    category: &'static str,
    keybinding: Option<&'static str>,
    action: PaletteAction,
) -> PaletteItem {
    PaletteItem {
        name,
        description,
        category,
        keybinding,
        action,
    }
}

pub(crate) fn default_items() -> Vec<PaletteItem> {
    use PaletteAction::Run;
    vec![
        item("new", "Start a new chat session", "Chat", Some("Ctrl+N"), Run("new")),
        item("clear", "Clear conversation history", "Chat", Some("Ctrl+L"), Run("clear")),
        item("history", "Show conversation history", "Chat", Some("Ctrl+H"), Run("history")),
        item(
            "model:gpt-oss-20b",
            "Switch to GPT OSS 20B model",
            "Models",
            None,
            Run("model openai/gpt-oss-20b"),
        ),
        item(
            "model:gpt-oss-120b",
            "Switch to GPT OSS 120B model",
            "Models",
            None,
            Run("model openai/gpt-oss-120b"),
        ),
        item(
            "model:compound-beta",
            "Switch to Compound Beta (with tools)",
            "Models",
            None,
            Run("model compound-beta"),
        ),
        item(
            "model:compound-beta-mini",
            "Switch to Compound Beta Mini",
            "Models",
            None,
            Run("model compound-beta-mini"),
        ),
        item(
            "status",
            "Show current model and conversation status",
            "Quick Actions",
            None,
            Run("status"),
        ),
        item("about", "Show application information", "Quick Actions", None, Run("about")),
        item("help", "Show available commands", "Commands", None, Run("help")),
        item("config", "Show current configuration", "Commands", None, Run("config")),
        item("exit", "Exit the application", "System", Some("Ctrl+Q"), PaletteAction::Exit),
    ]
}

/// Score how well `pattern` matches `text`; 0 means no match.
pub(crate) fn score_match(pattern: &str, text: &str) -> i64 {
    if pattern.is_empty() {
        return 100;
    }
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();

    if pattern == text {
        return 1000;
    }
    if text.starts_with(&pattern) {
        return 900;
    }
    if text.contains(&format!(" {pattern}")) || text.contains(&format!("-{pattern}")) {
        return 800;
    }
    if text.contains(&pattern) {
        return 700;
    }

    // Subsequence: every pattern character appears in order.
    let mut wanted = pattern.chars().peekable();
    let mut score = 0;
    for c in text.chars() {
        if wanted.peek() == Some(&c) {
            wanted.next();
            score += 50;
        }
    }
    if wanted.peek().is_none() { score + 200 } else { 0 }
}

pub(crate) fn score_item(pattern: &str, item: &PaletteItem) -> i64 {
    let name = score_match(pattern, item.name);
    let description = score_match(pattern, item.description) / 2;
    let category = score_match(pattern, item.category) / 3;
    name.max(description).max(category)
}

fn menu_page_size() -> usize {
    crossterm::terminal::size()
        .map(|(_, rows)| usize::from(rows) / 3)
        .unwrap_or(10)
        .max(5)
}

/// Show the palette and return the chosen action. `None` when cancelled.
pub(crate) fn choose(items: Vec<PaletteItem>) -> Result<Option<PaletteAction>> {
    // Registration order breaks ties between equal scores.
    let scorer = |input: &str, item: &PaletteItem, _: &str, idx: usize| -> Option<i64> {
        let score = score_item(input, item);
        (score > 0).then(|| score * 100 - idx as i64)
    };

    match Select::new("Command:", items)
        .with_scorer(&scorer)
        .with_page_size(menu_page_size())
        .prompt()
    {
        Ok(choice) => Ok(Some(choice.action)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(Error::Prompt(e.to_string())),
    }
}

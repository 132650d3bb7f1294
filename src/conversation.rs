// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Conversation model and its on-disk formats.

use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::client::DEFAULT_MODEL;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default = "Local::now")]
    pub timestamp: DateTime<Local>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    pub(crate) fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// Role and content only, as sent to the chat completions API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ApiMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Conversation {
    #[serde(default = "generate_session_id")]
    pub session_id: String,
    #[serde(default = "Local::now")]
    pub created_at: DateTime<Local>,
    #[serde(default)]
    pub model: String,
    pub messages: Vec<Message>,
}

fn generate_session_id() -> String {
    format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
}

impl Conversation {
    pub(crate) fn new(model: &str) -> Self {
        Self {
            session_id: generate_session_id(),
            created_at: Local::now(),
            model: model.to_string(),
            messages: Vec::new(),
        }
    }

    pub(crate) fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn messages_for_api(&self) -> Vec<ApiMessage> {
        self.messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str(),
                content: m.content.clone(),
            })
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub(crate) fn user_message_count(&self) -> usize {
        self.count_role(Role::User)
    }

    pub(crate) fn assistant_message_count(&self) -> usize {
        self.count_role(Role::Assistant)
    }

    fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    pub(crate) fn total_characters(&self) -> usize {
        self.messages.iter().map(|m| m.content.chars().count()).sum()
    }

    pub(crate) fn search(&self, query: &str, case_sensitive: bool) -> Vec<&Message> {
        if case_sensitive {
            return self
                .messages
                .iter()
                .filter(|m| m.content.contains(query))
                .collect();
        }
        let query = query.to_lowercase();
        self.messages
            .iter()
            .filter(|m| m.content.to_lowercase().contains(&query))
            .collect()
    }

    /// Write the conversation as pretty JSON, replacing `path` atomically.
    pub(crate) fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())
    }

    pub(crate) fn load_json(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        validate_document(&value)?;

        let mut conversation: Conversation = match serde_json::from_value(value) {
            Ok(conversation) => conversation,
            Err(e) => return Err(Error::InvalidConversation(e.to_string())),
        };
        if conversation.model.is_empty() {
            conversation.model = DEFAULT_MODEL.to_string();
        }
        Ok(conversation)
    }

    /// Export by file extension: `json`, `md` or `txt`.
    pub(crate) fn export(&self, path: &Path) -> Result<()> {
        let format = ExportFormat::from_path(path)?;
        let body = match format {
            ExportFormat::Json => serde_json::to_string_pretty(self)?,
            ExportFormat::Markdown => self.to_markdown(),
            ExportFormat::Text => self.to_text(),
        };
        write_atomic(path, body.as_bytes())
    }

    fn to_markdown(&self) -> String {
        let mut out = format!("# Conversation {}\n\n", self.session_id);
        let _ = writeln!(out, "- **Model:** {}", self.model);
        let _ = writeln!(
            out,
            "- **Created:** {}\n",
            self.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        for message in &self.messages {
            let title = match message.role {
                Role::System => "System",
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            let _ = writeln!(
                out,
                "## {title} ({})\n\n{}\n",
                message.timestamp.format("%H:%M:%S"),
                message.content
            );
        }
        out
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            let _ = writeln!(
                out,
                "[{}] {}:\n{}\n",
                message.timestamp.format("%Y-%m-%d %H:%M:%S"),
                message.role.as_str().to_uppercase(),
                message.content
            );
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExportFormat {
    Json,
    Markdown,
    Text,
}

impl ExportFormat {
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(ExportFormat::Json),
            "md" => Ok(ExportFormat::Markdown),
            "txt" => Ok(ExportFormat::Text),
            "" => Err(Error::Other(
                "File needs an extension: .json, .md or .txt".to_string(),
            )),
            other => Err(Error::Other(format!(
                "Unsupported export format: {other}. Use json, md or txt"
            ))),
        }
    }
}

/// Check the shape of a saved conversation before deserializing it.
fn validate_document(value: &serde_json::Value) -> Result<()> {
    let Some(messages) = value.get("messages") else {
        return Err(Error::InvalidConversation("missing `messages`".to_string()));
    };
    let Some(messages) = messages.as_array() else {
        return Err(Error::InvalidConversation(
            "`messages` is not a list".to_string(),
        ));
    };
    for (idx, message) in messages.iter().enumerate() {
        if message.get("content").is_none() {
            return Err(Error::InvalidConversation(format!(
                "message {idx} has no content"
            )));
        }
        match message.get("role").and_then(|r| r.as_str()) {
            Some("user" | "assistant") => {}
            Some(other) => {
                return Err(Error::InvalidConversation(format!(
                    "message {idx} has unsupported role `{other}`"
                )));
            }
            None => {
                return Err(Error::InvalidConversation(format!(
                    "message {idx} has no role"
                )));
            }
        }
    }
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".gpt-cli-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

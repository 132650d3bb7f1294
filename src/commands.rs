// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Typed command definitions.
//!
//! Commands are plain words because `/` on an empty prompt opens the palette.

use std::path::PathBuf;

use crate::client;
use crate::conversation::ExportFormat;
use crate::error::{Error, Result};

/// Command identifier for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    New,
    Clear,
    History,
    /// `None` resets to the configured default.
    Model(Option<String>),
    Models,
    Status,
    About,
    /// `config` lists settings, `config <key> <value>` changes one.
    Config(Option<(String, String)>),
    Save(PathBuf),
    Load(PathBuf),
    /// Read a text file into the prompt for editing before sending.
    LoadDocument(PathBuf),
    Search(String),
}

#[derive(Debug, Clone)]
pub(crate) struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    /// Commands without arguments only match when typed alone.
    takes_args: bool,
}

pub(crate) const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        usage: "help",
        description: "Show available commands",
        takes_args: false,
    },
    CommandSpec {
        name: "new",
        usage: "new",
        description: "Start a new chat session",
        takes_args: false,
    },
    CommandSpec {
        name: "clear",
        usage: "clear",
        description: "Clear conversation history",
        takes_args: false,
    },
    CommandSpec {
        name: "history",
        usage: "history",
        description: "Show conversation history",
        takes_args: false,
    },
    CommandSpec {
        name: "model",
        usage: "model [name]",
        description: "Switch model, or reset to the default",
        takes_args: true,
    },
    CommandSpec {
        name: "models",
        usage: "models",
        description: "List available models",
        takes_args: false,
    },
    CommandSpec {
        name: "status",
        usage: "status",
        description: "Show session status",
        takes_args: false,
    },
    CommandSpec {
        name: "about",
        usage: "about",
        description: "About this program",
        takes_args: false,
    },
    CommandSpec {
        name: "config",
        usage: "config [key value]",
        description: "Show or change settings (alias: settings)",
        takes_args: true,
    },
    CommandSpec {
        name: "save",
        usage: "save <file>",
        description: "Export the conversation (.json, .md or .txt)",
        takes_args: true,
    },
    CommandSpec {
        name: "load",
        usage: "load <file>",
        description: "Load a conversation saved as JSON",
        takes_args: true,
    },
    CommandSpec {
        name: "search",
        usage: "search <text>",
        description: "Find messages containing text (case-insensitive)",
        takes_args: true,
    },
    CommandSpec {
        name: "load doc",
        usage: "load doc <file>",
        description: "Edit a text file's contents before sending",
        takes_args: true,
    },
];

fn find_spec(name: &str) -> Option<&'static CommandSpec> {
    let name = if name == "settings" { "config" } else { name };
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// Parse user input into a command.
///
/// Returns `Ok(None)` when the input is a chat message, and an error when it
/// names a command but its arguments are wrong.
pub(crate) fn parse(input: &str) -> Result<Option<Command>> {
    let mut words = input.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };
    let name = first.to_lowercase();
    let args: Vec<&str> = words.collect();

    let Some(spec) = find_spec(&name) else {
        return Ok(None);
    };
    if !spec.takes_args && !args.is_empty() {
        return Ok(None);
    }

    let command = match spec.name {
        "help" => Command::Help,
        "new" => Command::New,
        "clear" => Command::Clear,
        "history" => Command::History,
        "models" => Command::Models,
        "status" => Command::Status,
        "about" => Command::About,
        "model" => Command::Model(parse_model_args(&args)?),
        "config" => match args.as_slice() {
            [] => Command::Config(None),
            [key, value @ ..] if !value.is_empty() => {
                Command::Config(Some((key.to_lowercase(), value.join(" "))))
            }
            _ => return Err(usage_error("config or config <key> <value>")),
        },
        "save" => Command::Save(parse_export_path(&args)?),
        "search" if args.is_empty() => return Err(usage_error("search <text>")),
        "search" => Command::Search(args.join(" ")),
        "load" => match args.as_slice() {
            [doc, rest @ ..] if doc.eq_ignore_ascii_case("doc") => {
                Command::LoadDocument(parse_file_arg(rest, "load doc <file>")?)
            }
            _ => Command::Load(parse_file_arg(&args, "load <file>")?),
        },
        _ => return Ok(None),
    };
    Ok(Some(command))
}

fn usage_error(usage: &str) -> Error {
    Error::Other(format!("Usage: {usage}"))
}

fn parse_model_args(args: &[&str]) -> Result<Option<String>> {
    match args {
        [] => Ok(None),
        [model] => {
            if client::validate_model(model) {
                Ok(Some(model.to_string()))
            } else {
                Err(Error::InvalidModel {
                    model: model.to_string(),
                    valid: client::model_ids().join(", "),
                })
            }
        }
        _ => Err(usage_error("model or model <model_name>")),
    }
}

fn parse_file_arg(args: &[&str], usage: &str) -> Result<PathBuf> {
    if args.is_empty() {
        return Err(usage_error(usage));
    }
    // File names may contain spaces.
    let name = args.join(" ");
    validate_filename(&name)?;
    Ok(PathBuf::from(name))
}

fn parse_export_path(args: &[&str]) -> Result<PathBuf> {
    let path = parse_file_arg(args, "save <file>")?;
    ExportFormat::from_path(&path)?;
    Ok(path)
}

const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Reject names with characters that are not portable across filesystems.
/// Path separators are allowed so files can be saved into directories.
pub(crate) fn validate_filename(name: &str) -> Result<()> {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if file_name.trim().is_empty() {
        return Err(Error::Other("Filename cannot be empty".to_string()));
    }
    if let Some(c) = name.chars().find(|c| ILLEGAL_FILENAME_CHARS.contains(c)) {
        return Err(Error::Other(format!("Filename contains invalid character: {c}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands_are_case_insensitive() {
        assert_eq!(parse("help").unwrap(), Some(Command::Help));
        assert_eq!(parse("  NEW ").unwrap(), Some(Command::New));
        assert_eq!(parse("History").unwrap(), Some(Command::History));
        assert_eq!(parse("models").unwrap(), Some(Command::Models));
    }

    #[test]
    fn test_chat_messages_are_not_commands() {
        assert_eq!(parse("what is rust?").unwrap(), None);
        assert_eq!(parse("").unwrap(), None);
        // A bare command word followed by text is a message.
        assert_eq!(parse("help me write a poem").unwrap(), None);
        assert_eq!(parse("clear skies today").unwrap(), None);
    }

    #[test]
    fn test_model_command() {
        assert_eq!(parse("model").unwrap(), Some(Command::Model(None)));
        assert_eq!(
            parse("model compound-beta").unwrap(),
            Some(Command::Model(Some("compound-beta".to_string())))
        );
        assert!(matches!(
            parse("model gpt-4"),
            Err(Error::InvalidModel { .. })
        ));
        match parse("model a b") {
            Err(Error::Other(msg)) => assert_eq!(msg, "Usage: model or model <model_name>"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_config_command() {
        assert_eq!(parse("config").unwrap(), Some(Command::Config(None)));
        assert_eq!(parse("settings").unwrap(), Some(Command::Config(None)));
        assert_eq!(
            parse("config Temperature 0.5").unwrap(),
            Some(Command::Config(Some((
                "temperature".to_string(),
                "0.5".to_string()
            ))))
        );
        assert_eq!(
            parse("config history_file my chats.json").unwrap(),
            Some(Command::Config(Some((
                "history_file".to_string(),
                "my chats.json".to_string()
            ))))
        );
        assert!(parse("config temperature").is_err());
    }

    #[test]
    fn test_save_and_load() {
        assert_eq!(
            parse("save chat.md").unwrap(),
            Some(Command::Save(PathBuf::from("chat.md")))
        );
        assert!(parse("save").is_err());
        assert!(parse("save chat.pdf").is_err());
        assert!(parse("save bad|name.json").is_err());

        assert_eq!(
            parse("load old.json").unwrap(),
            Some(Command::Load(PathBuf::from("old.json")))
        );
        assert_eq!(
            parse("load doc notes.txt").unwrap(),
            Some(Command::LoadDocument(PathBuf::from("notes.txt")))
        );
        assert!(parse("load doc").is_err());
    }

    #[test]
    fn test_search_command() {
        assert_eq!(
            parse("search rust  traits").unwrap(),
            Some(Command::Search("rust traits".to_string()))
        );
        assert!(parse("search").is_err());
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("chat.json").is_ok());
        assert!(validate_filename("exports/chat.json").is_ok());
        assert!(validate_filename("   ").is_err());
        assert!(validate_filename("dir/").is_err());
        for bad in ["a<b", "a>b", "a:b", "a\"b", "a?b", "a*b"] {
            assert!(validate_filename(bad).is_err(), "{bad}");
        }
    }
}

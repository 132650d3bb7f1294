// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Interactive chat session: the prompt loop, typed commands and response
//! rendering.

mod buffer;
pub(crate) mod history;
mod input;
mod keys;
mod palette;
mod render;
mod terminal;

use std::fs;
use std::io::{self, Stdout, Write};
use std::path::Path;

use colored::{Color, Colorize};
use crossterm::cursor::{MoveTo, MoveToColumn};
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};

use crate::client::{self, Completion, GroqClient, StreamEvent};
use crate::commands::{self, Command};
use crate::config::Config;
use crate::conversation::{ApiMessage, Conversation, Message, Role};
use crate::display;
use crate::error::{Error, Result};

use input::{LineEditor, PaletteHook, PaletteOutcome, ReadOutcome};
use palette::PaletteAction;
use terminal::TtyKeys;

pub(crate) struct ChatSession {
    editor: LineEditor<TtyKeys, Stdout>,
    state: SessionState,
}

impl ChatSession {
    pub(crate) fn new(config: Config) -> Result<Self> {
        let editor = LineEditor::new(
            TtyKeys::new(),
            io::stdout(),
            config.ui.history_size,
            config.escape_timeout(),
        );
        Ok(Self {
            editor,
            state: SessionState::new(config)?,
        })
    }

    pub(crate) async fn run(&mut self) -> Result<()> {
        if self.state.config.clear_on_start() {
            let _ = execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
        }
        print!("{}", display::welcome());
        let info = client::model_info(&self.state.current_model);
        if info.supports_tools {
            display::compound_panel(info).print();
        }
        println!();

        loop {
            println!("{}", display::status_line(&self.state.current_model));
            let prefill = self.state.prefill.take().unwrap_or_default();
            match self.editor.read_line(&prefill, &mut self.state)? {
                ReadOutcome::Submitted(text) => self.state.handle_input(text).await,
                ReadOutcome::Skipped => {}
                ReadOutcome::Exit | ReadOutcome::Interrupted => break,
            }
        }

        self.state.save_history();
        println!("{}", "Goodbye!".yellow());
        Ok(())
    }

    /// Answer a single prompt and return.
    pub(crate) async fn run_once(&mut self, prompt: String) -> Result<()> {
        let result = self.state.chat(prompt).await;
        self.state.save_history();
        result
    }
}

/// Everything except the editor, so the editor can borrow it as the
/// palette hook while `read_line` runs.
struct SessionState {
    config: Config,
    client: GroqClient,
    conversation: Conversation,
    current_model: String,
    /// Text to seed the next prompt with.
    prefill: Option<String>,
}

impl SessionState {
    fn new(config: Config) -> Result<Self> {
        let client = GroqClient::new(&config)?;
        let current_model = config.default_model.clone();
        Ok(Self {
            client,
            conversation: Conversation::new(&current_model),
            current_model,
            config,
            prefill: None,
        })
    }

    async fn handle_input(&mut self, text: String) {
        match commands::parse(&text) {
            Ok(Some(command)) => {
                if let Err(e) = self.execute(command) {
                    display::error_panel(&e.display_message()).print();
                }
            }
            Ok(None) => {
                // Failures are already on screen.
                let _ = self.chat(text).await;
            }
            Err(e) => display::error_panel(&e.display_message()).print(),
        }
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        tracing::debug!(?command, "running command");
        match command {
            Command::Help => {
                display::help_table().print();
                println!("Press {} on an empty prompt for the command palette.", "/".cyan());
            }
            Command::New => {
                self.current_model = self.config.default_model.clone();
                self.conversation = Conversation::new(&self.current_model);
                success("Started new chat session.");
            }
            Command::Clear => {
                self.conversation.clear();
                success("Conversation history cleared.");
            }
            Command::History => {
                if self.conversation.is_empty() {
                    println!("{}", "No conversation history.".yellow());
                } else {
                    display::history_table(&self.conversation.messages).print();
                }
            }
            Command::Model(None) => {
                self.switch_model(self.config.default_model.clone());
                success(&format!("Reset to default model: {}", self.current_model));
            }
            Command::Model(Some(model)) => {
                self.switch_model(model);
                success(&format!("Switched to model: {}", self.current_model));
            }
            Command::Models => display::models_table(&self.current_model).print(),
            Command::Status => display::info_panel(&self.status_text()).print(),
            Command::About => display::info_panel(&about_text()).print(),
            Command::Config(None) => {
                display::config_table(&self.config.entries()).print();
                if let Some(path) = &self.config.source {
                    println!("{}", format!("Loaded from {}", path.display()).bright_black());
                }
                let hint = format!(
                    "Change a setting with: config <key> <value>  (keys: {})",
                    crate::config::SETTABLE_KEYS.join(", ")
                );
                println!("{}", hint.bright_black());
            }
            Command::Config(Some((key, value))) => self.set_config(&key, &value)?,
            Command::Save(path) => {
                self.conversation.export(&path)?;
                success(&format!("Conversation saved to {}", path.display()));
            }
            Command::Load(path) => self.load_conversation(&path)?,
            Command::Search(query) => {
                let matches: Vec<Message> = self
                    .conversation
                    .search(&query, false)
                    .into_iter()
                    .cloned()
                    .collect();
                if matches.is_empty() {
                    println!("{}", format!("No messages contain \"{query}\".").yellow());
                } else {
                    display::history_table(&matches).print();
                }
            }
            Command::LoadDocument(path) => {
                let text = fs::read_to_string(&path)?;
                success(&format!(
                    "Loaded {} ({} characters). Edit it below and press Enter to send.",
                    path.display(),
                    text.chars().count()
                ));
                self.prefill = Some(text);
            }
        }
        Ok(())
    }

    fn switch_model(&mut self, model: String) {
        self.current_model = model;
        self.conversation.model = self.current_model.clone();
        let info = client::model_info(&self.current_model);
        if info.supports_tools {
            display::compound_panel(info).print();
        }
    }

    fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        self.config.set(key, value)?;
        self.client.update_settings(&self.config);
        success(&format!("Set {key} = {value}"));

        let Some(path) = self.config.save_path() else {
            return Err(Error::Config(
                "No configuration directory; the change lasts for this session only".to_string(),
            ));
        };
        self.config.save(&path)?;
        println!("{}", format!("Saved to {}", path.display()).bright_black());
        Ok(())
    }

    fn load_conversation(&mut self, path: &Path) -> Result<()> {
        let conversation = Conversation::load_json(path)?;
        if client::validate_model(&conversation.model) {
            self.current_model = conversation.model.clone();
        }
        success(&format!(
            "Loaded {} messages from {}",
            conversation.message_count(),
            path.display()
        ));
        self.conversation = conversation;
        Ok(())
    }

    fn status_text(&self) -> String {
        let info = client::model_info(&self.current_model);
        format!(
            "Model: {} ({})\n\
             Session: {}\n\
             Messages: {} ({} from you, {} from the assistant)\n\
             Characters: {}\n\
             Reasoning effort: {}\n\
             History file: {}",
            self.current_model,
            info.name,
            self.conversation.session_id,
            self.conversation.message_count(),
            self.conversation.user_message_count(),
            self.conversation.assistant_message_count(),
            self.conversation.total_characters(),
            self.config.reasoning_effort,
            if self.config.save_history {
                self.config.history_file.display().to_string()
            } else {
                "disabled".to_string()
            },
        )
    }

    /// Send `text` as a user turn and render the answer. Ctrl+C cancels the
    /// request; the unanswered message is then dropped from the conversation.
    async fn chat(&mut self, text: String) -> Result<()> {
        self.conversation.add_message(Message::new(Role::User, text));
        let messages = self.conversation.messages_for_api();

        let result = tokio::select! {
            result = self.respond(&messages) => result,
            _ = tokio::signal::ctrl_c() => Err(Error::Interrupted),
        };

        match result {
            Ok(completion) => {
                let mut message = Message::new(Role::Assistant, completion.content);
                message
                    .metadata
                    .insert("model".to_string(), completion.model.into());
                if let Some(usage) = completion.usage {
                    message
                        .metadata
                        .insert("total_tokens".to_string(), usage.total_tokens.into());
                }
                self.conversation.add_message(message);
                Ok(())
            }
            Err(e) => {
                self.conversation.messages.pop();
                match &e {
                    Error::Interrupted => println!("\n{}", "Response cancelled.".yellow()),
                    other => display::error_panel(&other.display_message()).print(),
                }
                Err(e)
            }
        }
    }

    async fn respond(&self, messages: &[ApiMessage]) -> Result<Completion> {
        let model = self.current_model.as_str();
        let info = client::model_info(model);

        if info.supports_streaming {
            let mut printer = StreamPrinter::new(self.config.show_reasoning_panel);
            let completion = self
                .client
                .stream_completion(messages, model, |event| printer.on_event(event))
                .await?;
            printer.finish(&completion);
            if let Some(usage) = &completion.usage {
                display::usage_panel(usage).print();
            }
            return Ok(completion);
        }

        print!("{}", "Working...".bright_black());
        let _ = io::stdout().flush();
        let completion = self.client.complete(messages, model).await;
        clear_line();
        let completion = completion?;

        if self.config.show_reasoning_panel
            && let Some(reasoning) = &completion.reasoning
        {
            display::reasoning_panel(reasoning).print();
        }
        display::response_panel(&completion.content, &completion.model).print();
        if completion.executed_tools > 0 {
            display::tools_panel(completion.executed_tools).print();
        }
        if let Some(usage) = &completion.usage {
            display::usage_panel(usage).print();
        }
        Ok(completion)
    }

    fn save_history(&self) {
        if !self.config.save_history || self.conversation.is_empty() {
            return;
        }
        match self.conversation.save_json(&self.config.history_file) {
            Ok(()) => tracing::info!(
                "saved conversation to {}",
                self.config.history_file.display()
            ),
            Err(e) => {
                tracing::warn!("failed to save conversation: {e}");
                eprintln!("{}", format!("Failed to save history: {e}").red());
            }
        }
    }
}

impl PaletteHook for SessionState {
    fn open_palette(&mut self) -> Result<PaletteOutcome> {
        let action = palette::choose(palette::default_items())?;
        let line = match action {
            None => return Ok(PaletteOutcome::Continue),
            Some(PaletteAction::Exit) => return Ok(PaletteOutcome::Exit),
            Some(PaletteAction::Run(line)) => line,
        };
        match commands::parse(line) {
            Ok(Some(command)) => {
                if let Err(e) = self.execute(command) {
                    display::error_panel(&e.display_message()).print();
                }
            }
            Ok(None) => tracing::warn!("palette item `{line}` is not a command"),
            Err(e) => display::error_panel(&e.display_message()).print(),
        }
        Ok(PaletteOutcome::Continue)
    }
}

/// Prints a streamed response as it arrives. Reasoning is held back and,
/// when enabled, shown in its own panel before the answer starts.
struct StreamPrinter {
    show_reasoning: bool,
    reasoning: String,
    thinking_shown: bool,
    started: bool,
    at_line_start: bool,
}

impl StreamPrinter {
    fn new(show_reasoning: bool) -> Self {
        Self {
            show_reasoning,
            reasoning: String::new(),
            thinking_shown: false,
            started: false,
            at_line_start: true,
        }
    }

    fn on_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Reasoning(text) => {
                self.reasoning.push_str(&text);
                if !self.thinking_shown && !self.started {
                    print!("{}", "Thinking...".bright_black());
                    let _ = io::stdout().flush();
                    self.thinking_shown = true;
                }
            }
            StreamEvent::Content(text) => {
                self.start();
                print!("{text}");
                self.at_line_start = text.ends_with('\n');
                let _ = io::stdout().flush();
            }
        }
    }

    fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        if self.thinking_shown {
            clear_line();
        }
        if self.show_reasoning && !self.reasoning.trim().is_empty() {
            display::reasoning_panel(&self.reasoning).print();
        }
        println!("{}", display::stream_header("Response", Color::Cyan));
    }

    fn finish(&mut self, completion: &Completion) {
        self.start();
        if !self.at_line_start {
            println!();
        }
        println!(
            "{}",
            display::stream_footer(Some(&completion.model), Color::Cyan)
        );
    }
}

fn clear_line() {
    let _ = execute!(io::stdout(), MoveToColumn(0), Clear(ClearType::CurrentLine));
}

fn success(message: &str) {
    println!("{}", message.green());
}

fn about_text() -> String {
    format!(
        "gpt-cli {}\n\
         Terminal chat client for Groq-hosted models.\n\
         Enter sends, Ctrl+J inserts a newline, / opens the command palette.",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_state(dir: &TempDir) -> SessionState {
        let config = Config {
            api_key: Some("test-key".to_string()),
            history_file: dir.path().join("history.json"),
            source: Some(dir.path().join("config.json")),
            ..Config::default()
        };
        SessionState::new(config).unwrap()
    }

    #[test]
    fn test_new_resets_model_and_conversation() {
        let dir = TempDir::new().unwrap();
        let mut state = new_state(&dir);
        state.execute(Command::Model(Some("compound-beta".to_string()))).unwrap();
        state
            .conversation
            .add_message(Message::new(Role::User, "hi"));

        state.execute(Command::New).unwrap();
        assert_eq!(state.current_model, client::DEFAULT_MODEL);
        assert!(state.conversation.is_empty());
    }

    #[test]
    fn test_model_switch_and_reset() {
        let dir = TempDir::new().unwrap();
        let mut state = new_state(&dir);
        state
            .execute(Command::Model(Some("openai/gpt-oss-120b".to_string())))
            .unwrap();
        assert_eq!(state.current_model, "openai/gpt-oss-120b");
        assert_eq!(state.conversation.model, "openai/gpt-oss-120b");

        state.execute(Command::Model(None)).unwrap();
        assert_eq!(state.current_model, client::DEFAULT_MODEL);
    }

    #[test]
    fn test_save_then_load_conversation() {
        let dir = TempDir::new().unwrap();
        let mut state = new_state(&dir);
        state.current_model = "compound-beta-mini".to_string();
        state.conversation.model = state.current_model.clone();
        state
            .conversation
            .add_message(Message::new(Role::User, "question"));
        state
            .conversation
            .add_message(Message::new(Role::Assistant, "answer"));

        let path = dir.path().join("chat.json");
        state.execute(Command::Save(path.clone())).unwrap();

        let mut other = new_state(&dir);
        other.execute(Command::Load(path)).unwrap();
        assert_eq!(other.conversation.message_count(), 2);
        assert_eq!(other.current_model, "compound-beta-mini");
    }

    #[test]
    fn test_load_document_prefills_next_prompt() {
        let dir = TempDir::new().unwrap();
        let mut state = new_state(&dir);
        let doc = dir.path().join("notes.txt");
        fs::write(&doc, "line one\nline two").unwrap();

        state.execute(Command::LoadDocument(doc)).unwrap();
        assert_eq!(state.prefill.as_deref(), Some("line one\nline two"));

        let missing = dir.path().join("missing.txt");
        assert!(matches!(
            state.execute(Command::LoadDocument(missing)),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_config_set_updates_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut state = new_state(&dir);
        state
            .execute(Command::Config(Some((
                "temperature".to_string(),
                "0.3".to_string(),
            ))))
            .unwrap();
        assert_eq!(state.config.temperature, 0.3);

        let saved = fs::read_to_string(dir.path().join("config.json")).unwrap();
        let saved: serde_json::Value = serde_json::from_str(&saved).unwrap();
        assert!((saved["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);

        assert!(
            state
                .execute(Command::Config(Some((
                    "temperature".to_string(),
                    "9".to_string()
                ))))
                .is_err()
        );
        assert_eq!(state.config.temperature, 0.3);
    }

    #[test]
    fn test_save_history_only_when_enabled_and_non_empty() {
        let dir = TempDir::new().unwrap();
        let history = dir.path().join("history.json");

        let mut state = new_state(&dir);
        state.save_history();
        assert!(!history.exists());

        state
            .conversation
            .add_message(Message::new(Role::User, "keep me"));
        state.config.save_history = false;
        state.save_history();
        assert!(!history.exists());

        state.config.save_history = true;
        state.save_history();
        let loaded = Conversation::load_json(&history).unwrap();
        assert_eq!(loaded.messages[0].content, "keep me");
    }

    #[test]
    fn test_stream_printer_tracks_line_start() {
        let mut printer = StreamPrinter::new(false);
        printer.on_event(StreamEvent::Reasoning("hmm".to_string()));
        assert!(printer.thinking_shown);
        assert!(!printer.started);

        printer.on_event(StreamEvent::Content("Hello".to_string()));
        assert!(printer.started);
        assert!(!printer.at_line_start);
        assert_eq!(printer.reasoning, "hmm");

        printer.on_event(StreamEvent::Content(" world\n".to_string()));
        assert!(printer.at_line_start);
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client;
use crate::error::{Error, Result};

const APP_DIR: &str = "gpt-cli";
const API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(ReasoningEffort::Low),
            "medium" => Some(ReasoningEffort::Medium),
            "high" => Some(ReasoningEffort::High),
            _ => None,
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct UiConfig {
    /// Overrides the top-level `clear_on_start` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_on_start: Option<bool>,
    /// How long to wait after Escape for the rest of a key sequence.
    pub escape_timeout_ms: u64,
    /// Prompt history entries kept for arrow-key recall.
    pub history_size: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            clear_on_start: None,
            escape_timeout_ms: 10,
            history_size: crate::cli::history::DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub default_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub save_history: bool,
    pub history_file: PathBuf,
    pub retry_attempts: u32,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub reasoning_effort: ReasoningEffort,
    pub include_reasoning: bool,
    pub show_reasoning_panel: bool,
    pub clear_on_start: bool,
    pub ui: UiConfig,

    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
    #[serde(skip)]
    pub(crate) api_key_from_env: bool,
    /// The key as stored in the file, kept for `save` when the environment
    /// overrides it.
    #[serde(skip)]
    pub(crate) file_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: client::DEFAULT_MODEL.to_string(),
            max_tokens: 8192,
            temperature: 1.0,
            save_history: true,
            history_file: PathBuf::from("conversation_history.json"),
            retry_attempts: 3,
            timeout: 30,
            reasoning_effort: ReasoningEffort::Medium,
            include_reasoning: true,
            show_reasoning_panel: false,
            clear_on_start: true,
            ui: UiConfig::default(),
            source: None,
            api_key_from_env: false,
            file_api_key: None,
        }
    }
}

/// Keys accepted by `Config::set`, in display order.
pub(crate) const SETTABLE_KEYS: &[&str] = &[
    "default_model",
    "max_tokens",
    "temperature",
    "save_history",
    "history_file",
    "retry_attempts",
    "timeout",
    "reasoning_effort",
    "include_reasoning",
    "show_reasoning_panel",
    "clear_on_start",
];

impl Config {
    pub(crate) fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR))
    }

    /// Load from the process environment and the first config file found.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(&search_paths()),
        };
        Self::load_with(path.as_deref(), |key| env::var(key).ok())
    }

    /// Defaults, then `GPT_*` variables, then the file. The API key variable
    /// beats everything.
    pub(crate) fn load_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(&lookup);

        if let Some(path) = path {
            tracing::info!("loading config from {}", path.display());
            let overlay = read_file(path)?;
            let mut merged = serde_json::to_value(&config)?;
            merge_values(&mut merged, overlay);
            config = serde_json::from_value(merged)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
            config.source = Some(path.to_path_buf());
            config.file_api_key = config.api_key.clone();
        } else {
            tracing::debug!("no config file found, using defaults");
        }

        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            config.api_key = Some(key);
            config.api_key_from_env = true;
        }
        Ok(config)
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        for (var, key) in [
            ("GPT_DEFAULT_MODEL", "default_model"),
            ("GPT_MAX_TOKENS", "max_tokens"),
            ("GPT_TEMPERATURE", "temperature"),
            ("GPT_SAVE_HISTORY", "save_history"),
            ("GPT_HISTORY_FILE", "history_file"),
            ("GPT_RETRY_ATTEMPTS", "retry_attempts"),
            ("GPT_TIMEOUT", "timeout"),
            ("GPT_REASONING_EFFORT", "reasoning_effort"),
            ("GPT_INCLUDE_REASONING", "include_reasoning"),
            ("GPT_SHOW_REASONING_PANEL", "show_reasoning_panel"),
            ("GPT_CLEAR_ON_START", "clear_on_start"),
        ] {
            if let Some(value) = lookup(var)
                && let Err(e) = self.assign(key, &value)
            {
                tracing::warn!("ignoring {var}: {e}");
            }
        }
    }

    /// Parse and store a single value without range checks.
    fn assign(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let invalid = |what: &str| Error::Config(format!("{key} expects {what}, got `{value}`"));
        match key {
            "default_model" => self.default_model = value.to_string(),
            "max_tokens" => self.max_tokens = value.parse().map_err(|_| invalid("an integer"))?,
            "temperature" => self.temperature = value.parse().map_err(|_| invalid("a number"))?,
            "save_history" => {
                self.save_history = parse_bool(value).ok_or_else(|| invalid("true or false"))?
            }
            "history_file" => self.history_file = PathBuf::from(value),
            "retry_attempts" => {
                self.retry_attempts = value.parse().map_err(|_| invalid("an integer"))?
            }
            "timeout" => self.timeout = value.parse().map_err(|_| invalid("seconds"))?,
            "reasoning_effort" => {
                self.reasoning_effort =
                    ReasoningEffort::parse(value).ok_or_else(|| invalid("low, medium or high"))?
            }
            "include_reasoning" => {
                self.include_reasoning = parse_bool(value).ok_or_else(|| invalid("true or false"))?
            }
            "show_reasoning_panel" => {
                self.show_reasoning_panel =
                    parse_bool(value).ok_or_else(|| invalid("true or false"))?
            }
            "clear_on_start" => {
                self.clear_on_start = parse_bool(value).ok_or_else(|| invalid("true or false"))?
            }
            other => {
                return Err(Error::Config(format!(
                    "Unknown setting `{other}`. Settable keys: {}",
                    SETTABLE_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Update one setting. The change is rolled back if it fails validation.
    pub(crate) fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        updated.assign(key, value)?;
        let problems = updated.validate();
        if let Some(problem) = problems.into_iter().next() {
            return Err(Error::Config(problem));
        }
        *self = updated;
        Ok(())
    }

    pub(crate) fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(0.0..=2.0).contains(&self.temperature) {
            errors.push("Temperature must be between 0.0 and 2.0".to_string());
        }
        if !(1..=32000).contains(&self.max_tokens) {
            errors.push("Max tokens must be between 1 and 32000".to_string());
        }
        if !(1..=10).contains(&self.retry_attempts) {
            errors.push("Retry attempts must be between 1 and 10".to_string());
        }
        if !(1..=300).contains(&self.timeout) {
            errors.push("Timeout must be between 1 and 300 seconds".to_string());
        }
        if !client::validate_model(&self.default_model) {
            errors.push(format!(
                "Invalid default model: {}. Valid models: {}",
                self.default_model,
                client::model_ids().join(", ")
            ));
        }
        errors
    }

    /// Write the configuration. TOML for `.toml` paths, JSON otherwise.
    /// A key that came from the environment is not written out; the file's
    /// own key is written back in its place.
    pub(crate) fn save(&self, path: &Path) -> Result<()> {
        let mut persisted = self.clone();
        if persisted.api_key_from_env {
            persisted.api_key = self.file_api_key.clone();
        }
        let body = if is_toml(path) {
            toml::to_string_pretty(&persisted)
                .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?
        } else {
            serde_json::to_string_pretty(&persisted)?
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, body)?;
        tracing::info!("saved config to {}", path.display());
        Ok(())
    }

    /// Where `save` should write: the file we loaded from, or the user config dir.
    pub(crate) fn save_path(&self) -> Option<PathBuf> {
        self.source
            .clone()
            .or_else(|| Self::config_dir().map(|dir| dir.join("config.json")))
    }

    pub(crate) fn clear_on_start(&self) -> bool {
        self.ui.clear_on_start.unwrap_or(self.clear_on_start)
    }

    pub(crate) fn escape_timeout(&self) -> Duration {
        Duration::from_millis(self.ui.escape_timeout_ms)
    }

    pub(crate) fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Settings as displayable key/value pairs.
    pub(crate) fn entries(&self) -> Vec<(&'static str, String)> {
        let api_key = if self.has_api_key() {
            if self.api_key_from_env {
                format!("set (from {API_KEY_ENV})")
            } else {
                "set".to_string()
            }
        } else {
            "not set".to_string()
        };
        vec![
            ("api_key", api_key),
            ("default_model", self.default_model.clone()),
            ("max_tokens", self.max_tokens.to_string()),
            ("temperature", self.temperature.to_string()),
            ("save_history", self.save_history.to_string()),
            ("history_file", self.history_file.display().to_string()),
            ("retry_attempts", self.retry_attempts.to_string()),
            ("timeout", format!("{}s", self.timeout)),
            ("reasoning_effort", self.reasoning_effort.to_string()),
            ("include_reasoning", self.include_reasoning.to_string()),
            ("show_reasoning_panel", self.show_reasoning_panel.to_string()),
            ("clear_on_start", self.clear_on_start().to_string()),
        ]
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

fn search_paths() -> Vec<PathBuf> {
    let config_dir = Config::config_dir();
    let mut paths = Vec::new();
    for name in ["config.json", "config.toml"] {
        paths.push(PathBuf::from(name));
        if let Some(dir) = &config_dir {
            paths.push(dir.join(name));
        }
    }
    paths
}

fn find_config_file(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned()
}

fn read_file(path: &Path) -> Result<serde_json::Value> {
    let text = fs::read_to_string(path)?;
    let parsed = if is_toml(path) {
        toml::from_str::<toml::Value>(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
            .and_then(|value| serde_json::to_value(value).map_err(Error::from))
    } else {
        serde_json::from_str::<serde_json::Value>(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }?;
    if !parsed.is_object() {
        return Err(Error::Config(format!(
            "{}: expected a table of settings",
            path.display()
        )));
    }
    Ok(parsed)
}

/// Overlay `overlay` onto `base`, recursing into nested objects.
fn merge_values(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                let nested = value.is_object() && base.get(&key).is_some_and(|v| v.is_object());
                match base.get_mut(&key) {
                    Some(existing) if nested => merge_values(existing, value),
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

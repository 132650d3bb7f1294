// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Groq chat completions client.
//!
//! Groq exposes an OpenAI-compatible endpoint. Reasoning models stream their
//! chain of thought in a separate `reasoning` delta field; compound models
//! run server-side tools and are queried without streaming.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{Config, ReasoningEffort};
use crate::conversation::ApiMessage;
use crate::error::{Error, Result};
use crate::retry::{self, RetryPolicy};
use crate::sse::SseStream;

pub(crate) const API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const CONNECTIVITY_URL: &str = "https://api.groq.com";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) const DEFAULT_MODEL: &str = "openai/gpt-oss-20b";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub supports_streaming: bool,
    pub supports_tools: bool,
    pub supports_reasoning: bool,
    pub max_tokens: u32,
}

pub(crate) const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "openai/gpt-oss-20b",
        name: "GPT-OSS 20B",
        description: "Standard 20B parameter model",
        supports_streaming: true,
        supports_tools: false,
        supports_reasoning: true,
        max_tokens: 8192,
    },
    ModelInfo {
        id: "openai/gpt-oss-120b",
        name: "GPT-OSS 120B",
        description: "Larger 120B parameter model",
        supports_streaming: true,
        supports_tools: false,
        supports_reasoning: true,
        max_tokens: 8192,
    },
    ModelInfo {
        id: "compound-beta",
        name: "Compound AI Beta",
        description: "AI with web search & code execution (multiple tools)",
        supports_streaming: false,
        supports_tools: true,
        supports_reasoning: false,
        max_tokens: 8192,
    },
    ModelInfo {
        id: "compound-beta-mini",
        name: "Compound AI Beta Mini",
        description: "AI with web search & code execution (single tool, 3x faster)",
        supports_streaming: false,
        supports_tools: true,
        supports_reasoning: false,
        max_tokens: 8192,
    },
];

/// Capabilities assumed for a model outside the catalog.
const UNKNOWN_MODEL: ModelInfo = ModelInfo {
    id: "",
    name: "Unknown model",
    description: "Unknown model",
    supports_streaming: true,
    supports_tools: false,
    supports_reasoning: false,
    max_tokens: 8192,
};

pub(crate) fn model_info(id: &str) -> &'static ModelInfo {
    MODELS.iter().find(|m| m.id == id).unwrap_or(&UNKNOWN_MODEL)
}

pub(crate) fn validate_model(id: &str) -> bool {
    MODELS.iter().any(|m| m.id == id)
}

pub(crate) fn model_ids() -> Vec<&'static str> {
    MODELS.iter().map(|m| m.id).collect()
}

fn is_compound(model: &str) -> bool {
    model.starts_with("compound-")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StreamEvent {
    Content(String),
    Reasoning(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// A finished response.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Completion {
    pub content: String,
    pub reasoning: Option<String>,
    pub model: String,
    pub usage: Option<Usage>,
    pub executed_tools: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage],
    temperature: f32,
    max_completion_tokens: u32,
    top_p: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_reasoning: Option<bool>,
}

#[derive(Deserialize)]
struct GroqChunk {
    #[serde(default)]
    choices: Vec<GroqChunkChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    x_groq: Option<GroqExtra>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GroqExtra {
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct GroqChunkChoice {
    #[serde(default)]
    delta: GroqDelta,
}

#[derive(Default, Deserialize)]
struct GroqDelta {
    content: Option<String>,
    reasoning: Option<String>,
}

#[derive(Deserialize)]
struct GroqResponse {
    #[serde(default)]
    model: String,
    choices: Vec<GroqResponseChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct GroqResponseChoice {
    message: GroqResponseMessage,
}

#[derive(Deserialize)]
struct GroqResponseMessage {
    content: Option<String>,
    reasoning: Option<String>,
    #[serde(default)]
    executed_tools: Option<Vec<serde_json::Value>>,
}

/// Folds streamed `data:` payloads into a `Completion`.
#[derive(Debug, Default)]
struct StreamAccumulator {
    completion: Completion,
    reasoning: String,
}

impl StreamAccumulator {
    fn new(model: &str) -> Self {
        Self {
            completion: Completion {
                model: model.to_string(),
                ..Completion::default()
            },
            reasoning: String::new(),
        }
    }

    fn push(&mut self, data: &str) -> Result<Vec<StreamEvent>> {
        let chunk = match serde_json::from_str::<GroqChunk>(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!("skipping unparsable stream chunk: {e}");
                return Ok(Vec::new());
            }
        };
        if let Some(error) = chunk.error {
            return Err(Error::Api {
                status: 200,
                message: error.to_string(),
            });
        }
        if let Some(model) = chunk.model {
            self.completion.model = model;
        }
        if let Some(usage) = chunk.usage.or(chunk.x_groq.and_then(|x| x.usage)) {
            self.completion.usage = Some(usage);
        }

        let mut events = Vec::new();
        for choice in chunk.choices {
            if let Some(text) = choice.delta.reasoning.filter(|t| !t.is_empty()) {
                self.reasoning.push_str(&text);
                events.push(StreamEvent::Reasoning(text));
            }
            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                self.completion.content.push_str(&text);
                events.push(StreamEvent::Content(text));
            }
        }
        Ok(events)
    }

    fn finish(mut self) -> Completion {
        if !self.reasoning.is_empty() {
            self.completion.reasoning = Some(self.reasoning);
        }
        self.completion
    }
}

fn parse_response(body: &str, requested_model: &str) -> Result<Completion> {
    let response: GroqResponse = serde_json::from_str(body)?;
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(Error::Other("API response contained no choices".to_string()));
    };
    let model = if response.model.is_empty() {
        requested_model.to_string()
    } else {
        response.model
    };
    Ok(Completion {
        content: choice.message.content.unwrap_or_default(),
        reasoning: choice.message.reasoning.filter(|r| !r.is_empty()),
        model,
        usage: response.usage,
        executed_tools: choice.message.executed_tools.map_or(0, |tools| tools.len()),
    })
}

pub(crate) struct GroqClient {
    http: Client,
    api_key: String,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    reasoning_effort: ReasoningEffort,
    include_reasoning: bool,
    retry: RetryPolicy,
}

impl GroqClient {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
            return Err(Error::Config(
                "No API key found. Set the GROQ_API_KEY environment variable \
                 or add `api_key` to your config file."
                    .to_string(),
            ));
        };
        let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key,
            endpoint: API_URL.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout),
            reasoning_effort: config.reasoning_effort,
            include_reasoning: config.include_reasoning,
            retry: RetryPolicy::new(config.retry_attempts),
        })
    }

    /// Apply changed settings without rebuilding the HTTP client.
    pub(crate) fn update_settings(&mut self, config: &Config) {
        self.temperature = config.temperature;
        self.max_tokens = config.max_tokens;
        self.timeout = Duration::from_secs(config.timeout);
        self.reasoning_effort = config.reasoning_effort;
        self.include_reasoning = config.include_reasoning;
        self.retry = RetryPolicy::new(config.retry_attempts);
    }

    fn build_request<'a>(
        &self,
        messages: &'a [ApiMessage],
        model: &'a str,
        stream: bool,
    ) -> ChatRequest<'a> {
        let reasoning = !is_compound(model);
        ChatRequest {
            model,
            messages,
            temperature: self.temperature,
            max_completion_tokens: self.max_tokens,
            top_p: 1.0,
            stream,
            reasoning_effort: reasoning.then(|| self.reasoning_effort.as_str()),
            include_reasoning: reasoning.then_some(self.include_reasoning),
        }
    }

    async fn send_once(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body);
        if !body.stream {
            request = request.timeout(self.timeout);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status, message));
        }
        Ok(response)
    }

    /// Send with retries. A transport failure that persists is reported as
    /// `Error::Offline` when the API host is unreachable altogether.
    async fn send(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response> {
        tracing::info!(model = body.model, stream = body.stream, "sending chat request");
        match self.retry.run(|| self.send_once(body)).await {
            Err(Error::Http(e)) if e.is_connect() || e.is_timeout() => {
                if retry::check_connectivity(&self.http, CONNECTIVITY_URL).await {
                    Err(Error::Http(e))
                } else {
                    Err(Error::Offline)
                }
            }
            other => other,
        }
    }

    pub(crate) async fn stream_completion<F>(
        &self,
        messages: &[ApiMessage],
        model: &str,
        mut on_event: F,
    ) -> Result<Completion>
    where
        F: FnMut(StreamEvent),
    {
        let body = self.build_request(messages, model, true);
        let response = self.send(&body).await?;

        let mut accumulator = StreamAccumulator::new(model);
        let mut sse = SseStream::new(response.bytes_stream());
        while let Some(result) = sse.next_event().await {
            let data = result?;
            for event in accumulator.push(&data)? {
                on_event(event);
            }
        }
        let completion = accumulator.finish();
        tracing::debug!(
            chars = completion.content.len(),
            "stream finished for {}",
            completion.model
        );
        Ok(completion)
    }

    pub(crate) async fn complete(&self, messages: &[ApiMessage], model: &str) -> Result<Completion> {
        let body = self.build_request(messages, model, false);
        let response = self.send(&body).await?;
        let text = response.text().await?;
        parse_response(&text, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Chunk = std::result::Result<&'static [u8], ()>;

    async fn accumulate_stream(
        chunks: Vec<Chunk>,
        model: &str,
    ) -> Result<(Completion, Vec<StreamEvent>)> {
        let mut accumulator = StreamAccumulator::new(model);
        let mut events = Vec::new();
        let mut sse = SseStream::new(futures::stream::iter(chunks));
        while let Some(result) = sse.next_event().await {
            let data = result.unwrap();
            events.extend(accumulator.push(&data)?);
        }
        Ok((accumulator.finish(), events))
    }

    fn client_for(model_config: impl FnOnce(&mut Config)) -> GroqClient {
        let mut config = Config {
            api_key: Some("test-key".to_string()),
            ..Config::default()
        };
        model_config(&mut config);
        GroqClient::new(&config).unwrap()
    }

    fn messages() -> Vec<ApiMessage> {
        vec![ApiMessage {
            role: "user",
            content: "hi".to_string(),
        }]
    }

    #[test]
    fn test_catalog() {
        assert!(validate_model("compound-beta-mini"));
        assert!(!validate_model("gpt-4"));
        assert_eq!(model_info("openai/gpt-oss-120b").name, "GPT-OSS 120B");
        let unknown = model_info("mystery");
        assert!(unknown.supports_streaming);
        assert!(!unknown.supports_tools);
        assert_eq!(model_ids().len(), 4);
    }

    #[test]
    fn test_missing_api_key() {
        let config = Config::default();
        match GroqClient::new(&config) {
            Err(Error::Config(msg)) => assert!(msg.contains("GROQ_API_KEY")),
            other => panic!("expected config error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_request_body_for_reasoning_model() {
        let client = client_for(|c| {
            c.temperature = 0.7;
            c.max_tokens = 1024;
            c.reasoning_effort = ReasoningEffort::High;
        });
        let messages = messages();
        let body = serde_json::to_value(client.build_request(&messages, DEFAULT_MODEL, true)).unwrap();
        assert_eq!(body["model"], "openai/gpt-oss-20b");
        assert_eq!(body["max_completion_tokens"], 1024);
        assert_eq!(body["top_p"], 1.0);
        assert_eq!(body["stream"], true);
        assert_eq!(body["reasoning_effort"], "high");
        assert_eq!(body["include_reasoning"], true);
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_request_body_for_compound_model() {
        let client = client_for(|_| {});
        let messages = messages();
        let body =
            serde_json::to_value(client.build_request(&messages, "compound-beta", false)).unwrap();
        assert!(body.get("reasoning_effort").is_none());
        assert!(body.get("include_reasoning").is_none());
        assert_eq!(body["stream"], false);
    }

    #[tokio::test]
    async fn test_stream_accumulates_content_and_reasoning() {
        let chunks: Vec<Chunk> = vec![
            Ok(b"data: {\"model\":\"openai/gpt-oss-20b\",\"choices\":[{\"delta\":{\"reasoning\":\"think\"}}]}\n\n"),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n"),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}],\"x_groq\":{\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":2,\"total_tokens\":5}}}\n\n"),
            Ok(b"data: [DONE]\n\n"),
        ];
        let (completion, events) = accumulate_stream(chunks, "requested")
            .await
            .unwrap();
        assert_eq!(completion.content, "Hello");
        assert_eq!(completion.reasoning.as_deref(), Some("think"));
        assert_eq!(completion.model, "openai/gpt-oss-20b");
        assert_eq!(completion.usage.map(|u| u.total_tokens), Some(5));
        assert_eq!(
            events,
            vec![
                StreamEvent::Reasoning("think".to_string()),
                StreamEvent::Content("Hel".to_string()),
                StreamEvent::Content("lo".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_error_payload() {
        let chunks: Vec<Chunk> = vec![Ok(b"data: {\"error\":{\"message\":\"overloaded\"}}\n\n")];
        let result = accumulate_stream(chunks, "m").await;
        assert!(matches!(result, Err(Error::Api { .. })));
    }

    #[test]
    fn test_parse_non_streaming_response() {
        let body = r#"{
            "model": "compound-beta",
            "choices": [{"message": {"content": "42", "executed_tools": [{"type": "search"}, {"type": "python"}]}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
        }"#;
        let completion = parse_response(body, "compound-beta").unwrap();
        assert_eq!(completion.content, "42");
        assert_eq!(completion.executed_tools, 2);
        assert_eq!(completion.usage.unwrap().prompt_tokens, 10);
        assert!(completion.reasoning.is_none());

        assert!(parse_response(r#"{"choices": []}"#, "m").is_err());
    }
}

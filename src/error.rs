// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Retryable API error: {status} - {message}")]
    Retryable { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot connect to the Groq API. Check your internet connection.")]
    Offline,

    #[error("Invalid model: {model}. Valid models: {valid}")]
    InvalidModel { model: String, valid: String },

    #[error("Conversation file is not valid: {0}")]
    InvalidConversation(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Interrupted by user")]
    Interrupted,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns a concise message suitable for an error panel.
    /// For API errors, returns just the response body without the status prefix.
    /// If the body is JSON, it is pretty-printed.
    pub(crate) fn display_message(&self) -> String {
        match self {
            Error::Api { message, .. } | Error::Retryable { message, .. } => {
                if let Ok(json) = serde_json::from_str::<serde_json::Value>(message) {
                    serde_json::to_string_pretty(&json).unwrap_or_else(|_| message.clone())
                } else {
                    message.clone()
                }
            }
            other => other.to_string(),
        }
    }

    /// Check if this error is worth retrying (rate limited, server overloaded, dropped connection).
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            Error::Retryable { .. } => true,
            Error::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }

    /// Classify a non-success HTTP status into the retryable or terminal API variant.
    pub(crate) fn from_status(status: u16, message: String) -> Self {
        if status == 429 || status >= 500 {
            Error::Retryable { status, message }
        } else {
            Error::Api { status, message }
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            Error::from_status(429, String::new()),
            Error::Retryable { status: 429, .. }
        ));
        assert!(matches!(
            Error::from_status(503, String::new()),
            Error::Retryable { status: 503, .. }
        ));
        assert!(matches!(
            Error::from_status(401, String::new()),
            Error::Api { status: 401, .. }
        ));
        assert!(Error::from_status(502, String::new()).is_retryable());
        assert!(!Error::from_status(400, String::new()).is_retryable());
        assert!(!Error::Offline.is_retryable());
    }

    #[test]
    fn test_display_message_pretty_prints_json() {
        let err = Error::Api {
            status: 400,
            message: r#"{"error":{"message":"bad"}}"#.to_string(),
        };
        let shown = err.display_message();
        assert!(shown.contains('\n'));
        assert!(shown.contains("\"message\": \"bad\""));

        let plain = Error::Api {
            status: 500,
            message: "upstream down".to_string(),
        };
        assert_eq!(plain.display_message(), "upstream down");
    }
}

use std::time::Duration;

use thiserror::Error;

/// Longest error message surfaced to a stream consumer, in characters.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum StreamError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A non-streaming completion came back without any text.
    #[error("completion response contained no content")]
    EmptyCompletion,

    #[error("configuration error: {0}")]
    Configuration(#[from] anydoor_core::ConfigError),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No chunk arrived within the configured idle window.
    #[error("no data received from upstream for {0:?}")]
    IdleTimeout(Duration),
}

impl StreamError {
    /// Consumer-facing message, truncated to [`MAX_ERROR_MESSAGE_CHARS`].
    ///
    /// Upstream status errors surface the upstream body, or its JSON
    /// `error.message` / `message` field, rather than the wrapper text.
    #[must_use]
    pub fn consumer_message(&self) -> String {
        let message = match self {
            StreamError::UpstreamStatus { status, body } => {
                let body = body.trim();
                if body.is_empty() {
                    format!("upstream request failed: {status}")
                } else {
                    extract_json_message(body).unwrap_or_else(|| body.to_string())
                }
            }
            other => other.to_string(),
        };
        truncate_chars(&message, MAX_ERROR_MESSAGE_CHARS)
    }
}

fn extract_json_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

//! HTTP client for the OpenAI-compatible chat-completions backend.

use std::time::Duration;

use anydoor_core::{BackendTarget, GenerationSettings};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, TryStreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::StreamError;
use crate::prompt::page_prompt;
use crate::source::{ChunkSource, ChunkStream};
use crate::StreamRequest;

/// One instruction to send upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    /// Page-generation instruction for a stream request.
    #[must_use]
    pub fn for_page(request: &StreamRequest) -> Self {
        Self::new(page_prompt(&request.path, &request.user_agent))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Client for the generation backend.
///
/// Endpoint, key, and model are resolved per call, so a client built from
/// incomplete settings still constructs and reports
/// [`StreamError::Configuration`] only when a call needs the missing value.
/// The underlying `reqwest::Client` has a connect timeout but no overall
/// timeout: a generation stream may legitimately run for minutes.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    settings: GenerationSettings,
}

impl BackendClient {
    /// # Errors
    ///
    /// Returns [`StreamError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(settings: &GenerationSettings) -> Result<Self, StreamError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs.max(1)))
            .user_agent(concat!("anydoor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, settings))
    }

    /// Reuse an existing `reqwest::Client` (the server shares one pool).
    #[must_use]
    pub fn with_client(client: Client, settings: &GenerationSettings) -> Self {
        Self {
            client,
            settings: settings.clone(),
        }
    }

    /// True when page generation has everything it needs.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.settings.page_target().is_ok()
    }

    /// Start a streamed page generation and return the raw response.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Configuration`] when endpoint, key, or model is unset.
    /// - [`StreamError::Http`] on connection failure.
    /// - [`StreamError::UpstreamStatus`] on a non-2xx status, carrying the body.
    pub async fn open_stream(&self, request: &GenerationRequest) -> Result<Response, StreamError> {
        let target = self.settings.page_target()?;
        let response = self.post(&target, &request.prompt, true).await?;
        ensure_success(response).await
    }

    /// Non-streaming completion on the free model; returns the trimmed text.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Configuration`] when endpoint, key, or free model is unset.
    /// - [`StreamError::Http`] / [`StreamError::UpstreamStatus`] as for [`Self::open_stream`].
    /// - [`StreamError::Deserialize`] if the body is not a chat completion.
    /// - [`StreamError::EmptyCompletion`] if the completion has no text.
    pub async fn complete(&self, prompt: &str) -> Result<String, StreamError> {
        let target = self.settings.free_target()?;
        let response = ensure_success(self.post(&target, prompt, false).await?).await?;
        let body = response.bytes().await?;

        let completion: ChatCompletion =
            serde_json::from_slice(&body).map_err(|source| StreamError::Deserialize {
                context: format!("chat completion from {}", target.model),
                source,
            })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or(StreamError::EmptyCompletion)
    }

    async fn post(
        &self,
        target: &BackendTarget,
        prompt: &str,
        stream: bool,
    ) -> Result<Response, StreamError> {
        let body = ChatRequest {
            model: &target.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream,
            max_tokens: target.max_tokens,
        };
        let response = self
            .client
            .post(&target.endpoint)
            .bearer_auth(&target.api_key)
            .json(&body)
            .send()
            .await?;
        Ok(response)
    }
}

impl ChunkSource for BackendClient {
    fn open(&self, request: &StreamRequest) -> BoxFuture<'static, Result<ChunkStream, StreamError>> {
        let client = self.clone();
        let generation = GenerationRequest::for_page(request);
        async move {
            let response = client.open_stream(&generation).await?;
            Ok(response.bytes_stream().map_err(StreamError::from).boxed())
        }
        .boxed()
    }
}

/// Pass a 2xx response through; turn anything else into
/// [`StreamError::UpstreamStatus`] with the body text.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, StreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StreamError::UpstreamStatus {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_absent_max_tokens() {
        let body = ChatRequest {
            model: "m",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
            stream: false,
            max_tokens: None,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "model": "m",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": false
            })
        );
    }

    #[test]
    fn unconfigured_client_reports_not_configured() {
        let client = BackendClient::new(&GenerationSettings::default()).expect("client");
        assert!(!client.is_configured());
    }
}

//! Where stream bytes come from.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt, TryStreamExt};
use reqwest::{Client, Url};

use crate::backend::ensure_success;
use crate::error::StreamError;
use crate::StreamRequest;

/// Raw upstream body chunks, in arrival order.
pub type ChunkStream = BoxStream<'static, Result<Bytes, StreamError>>;

/// Anything that can open a generation byte stream for a request.
///
/// The returned future owns everything it needs, so the runtime can move it
/// into a spawned task.
pub trait ChunkSource: Send + Sync {
    fn open(&self, request: &StreamRequest) -> BoxFuture<'static, Result<ChunkStream, StreamError>>;
}

/// Reads generation streams through a running server's `/api/stream` route.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    stream_url: Url,
}

impl GatewayClient {
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidUrl`] if `base_url` does not parse, or
    /// [`StreamError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(base_url: &str) -> Result<Self, StreamError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("anydoor-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let stream_url = Url::parse(&normalised)
            .and_then(|base| base.join("api/stream"))
            .map_err(|e| StreamError::InvalidUrl {
                url: base_url.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self { client, stream_url })
    }

    #[must_use]
    pub fn stream_url(&self) -> &Url {
        &self.stream_url
    }
}

impl ChunkSource for GatewayClient {
    fn open(&self, request: &StreamRequest) -> BoxFuture<'static, Result<ChunkStream, StreamError>> {
        let client = self.client.clone();
        let url = self.stream_url.clone();
        let request = request.clone();
        async move {
            let response = client.post(url).json(&request).send().await?;
            let response = ensure_success(response).await?;
            Ok(response.bytes_stream().map_err(StreamError::from).boxed())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_is_joined_onto_base() {
        for base in ["http://localhost:3000", "http://localhost:3000/"] {
            let client = GatewayClient::new(base).expect("client");
            assert_eq!(client.stream_url().as_str(), "http://localhost:3000/api/stream");
        }
        let nested = GatewayClient::new("https://example.com/door").expect("client");
        assert_eq!(nested.stream_url().as_str(), "https://example.com/door/api/stream");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = GatewayClient::new("not a url").expect_err("should fail");
        assert!(matches!(err, StreamError::InvalidUrl { .. }));
    }
}

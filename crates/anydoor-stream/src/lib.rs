//! Streaming content assembly for generated pages.
//!
//! The upstream completion backend answers with a line-oriented event stream.
//! [`runtime::open`] drives one such stream: [`decoder`] splits it into lines
//! and extracts content deltas, [`assembler`] accumulates them, tracks the
//! document stage, and throttles snapshot emission, and the returned
//! [`StreamHandle`] hands snapshots to a single consumer until completion,
//! failure, or cancellation.

pub mod assembler;
pub mod backend;
pub mod decoder;
pub mod error;
pub mod prompt;
pub mod runtime;
pub mod source;

use serde::{Deserialize, Serialize};

pub use assembler::{Assembler, FlushDecision, Stage, StreamSnapshot};
pub use backend::BackendClient;
pub use decoder::{parse_line, LineDecoder, LineEvent};
pub use error::StreamError;
pub use runtime::{open, StreamEvent, StreamHandle, StreamOptions, StreamSlot};
pub use source::{ChunkSource, ChunkStream, GatewayClient};

/// Parameters for one generation stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    /// Raw request path, possibly percent-encoded.
    pub path: String,
    /// User-agent of the browser the page is generated for.
    #[serde(rename = "userAgent", default)]
    pub user_agent: String,
}

impl StreamRequest {
    #[must_use]
    pub fn new(path: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            user_agent: user_agent.into(),
        }
    }
}

//! `generate` drives one page stream through a running server and reports
//! stage transitions as they happen.

use std::sync::Arc;
use std::time::Duration;

use anydoor_stream::{
    ChunkSource, GatewayClient, Stage, StreamEvent, StreamOptions, StreamRequest, StreamSlot,
};

pub(crate) async fn run_generate(
    server: &str,
    path: &str,
    user_agent: &str,
    idle_timeout: Option<Duration>,
) -> anyhow::Result<()> {
    let client = GatewayClient::new(server)?;
    tracing::info!(url = %client.stream_url(), path, "requesting generation");

    let options = StreamOptions {
        idle_timeout,
        ..StreamOptions::default()
    };
    let request = StreamRequest::new(path, user_agent);
    let content = collect_page(&client, &request, options, |stage, len| {
        eprintln!("[{stage}] {len} bytes");
    })
    .await?;

    println!("{content}");
    Ok(())
}

/// Consume a stream to completion, calling `on_stage` once per stage change.
///
/// # Errors
///
/// Returns an error carrying the stream's failure message, or if the stream
/// ends without reaching [`Stage::Complete`].
async fn collect_page<F>(
    source: &dyn ChunkSource,
    request: &StreamRequest,
    options: StreamOptions,
    mut on_stage: F,
) -> anyhow::Result<Arc<str>>
where
    F: FnMut(Stage, usize),
{
    let mut slot = StreamSlot::new();
    let handle = slot.open(source, request, options);
    let mut stage = None;

    while let Some(event) = handle.next().await {
        match event {
            StreamEvent::Snapshot(snapshot) => {
                if stage != Some(snapshot.stage) {
                    stage = Some(snapshot.stage);
                    on_stage(snapshot.stage, snapshot.content.len());
                }
                if snapshot.stage == Stage::Complete {
                    return Ok(snapshot.content);
                }
            }
            StreamEvent::Failed { message } => {
                anyhow::bail!("generation failed: {message}");
            }
        }
    }

    anyhow::bail!("stream closed before the page was complete")
}

//! Cancellable stream runtime.
//!
//! [`open`] spawns one task per stream. The task owns the upstream body, the
//! line decoder, the [`Assembler`], and the flush timer; the consumer only
//! holds a [`StreamHandle`]. Aborting the task drops all of them at once, so
//! no timer can fire and no read can land after [`StreamHandle::cancel`].

use std::time::Duration;

use futures::future::BoxFuture;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;

use crate::assembler::{Assembler, FlushDecision, StreamSnapshot, DEFAULT_FLUSH_INTERVAL};
use crate::decoder::{parse_line, LineDecoder, LineEvent};
use crate::error::StreamError;
use crate::source::{ChunkSource, ChunkStream};
use crate::StreamRequest;

const DEFAULT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Minimum spacing between throttled snapshots.
    pub flush_interval: Duration,
    /// Fail the stream when neither the response nor a chunk arrives for this
    /// long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    pub channel_capacity: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            idle_timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Snapshot(StreamSnapshot),
    /// Terminal. Earlier snapshots are not retracted.
    Failed { message: String },
}

/// Consumer side of one stream.
#[derive(Debug)]
pub struct StreamHandle {
    events: mpsc::Receiver<StreamEvent>,
    task: JoinHandle<()>,
    cancelled: bool,
}

impl StreamHandle {
    /// Next event, or `None` once the stream has ended or been cancelled.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.cancelled {
            return None;
        }
        self.events.recv().await
    }

    /// Stop the stream. Nothing is delivered after this returns, including
    /// events already buffered.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.task.abort();
        self.events.close();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Open a stream for `request` and start driving it on the current tokio
/// runtime.
pub fn open(
    source: &dyn ChunkSource,
    request: &StreamRequest,
    options: StreamOptions,
) -> StreamHandle {
    let (tx, events) = mpsc::channel(options.channel_capacity.max(1));
    let connect = source.open(request);
    let span = tracing::debug_span!("generation_stream", path = %request.path);
    let task = tokio::spawn(drive(connect, tx, options).instrument(span));
    StreamHandle {
        events,
        task,
        cancelled: false,
    }
}

/// At most one live stream per consumer context.
#[derive(Debug, Default)]
pub struct StreamSlot {
    current: Option<StreamHandle>,
}

impl StreamSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the current stream, if any, then open and store a new one.
    pub fn open(
        &mut self,
        source: &dyn ChunkSource,
        request: &StreamRequest,
        options: StreamOptions,
    ) -> &mut StreamHandle {
        self.cancel();
        self.current.insert(open(source, request, options))
    }

    /// Cancel and discard the current stream. Returns `true` if one existed.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(mut handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    pub fn current(&mut self) -> Option<&mut StreamHandle> {
        self.current.as_mut()
    }
}

async fn drive(
    connect: BoxFuture<'static, Result<ChunkStream, StreamError>>,
    tx: mpsc::Sender<StreamEvent>,
    options: StreamOptions,
) {
    let mut assembler = Assembler::new(options.flush_interval);
    let mut decoder = LineDecoder::new();

    // The idle window also covers the wait for response headers.
    let connected = match options.idle_timeout {
        Some(idle) => match tokio::time::timeout(idle, connect).await {
            Ok(result) => result,
            Err(_) => Err(StreamError::IdleTimeout(idle)),
        },
        None => connect.await,
    };
    let mut chunks = match connected {
        Ok(chunks) => chunks,
        Err(error) => {
            fail(&tx, &mut assembler, &error).await;
            return;
        }
    };
    let mut last_chunk_at = Instant::now();

    loop {
        let flush_at = assembler.pending_flush();
        let idle_at = options.idle_timeout.map(|idle| last_chunk_at + idle);

        tokio::select! {
            biased;

            () = sleep_until(flush_at) => {
                if let Some(snapshot) = assembler.flush(Instant::now()) {
                    if !emit(&tx, StreamEvent::Snapshot(snapshot)).await {
                        return;
                    }
                }
            }
            () = sleep_until(idle_at) => {
                let idle = options.idle_timeout.unwrap_or_default();
                fail(&tx, &mut assembler, &StreamError::IdleTimeout(idle)).await;
                return;
            }
            next = chunks.next() => match next {
                Some(Ok(bytes)) => {
                    last_chunk_at = Instant::now();
                    for line in decoder.push(&bytes) {
                        if !ingest(&mut assembler, &tx, &line).await {
                            return;
                        }
                    }
                }
                Some(Err(error)) => {
                    fail(&tx, &mut assembler, &error).await;
                    return;
                }
                None => break,
            },
        }
    }

    if let Some(line) = decoder.finish() {
        if !ingest(&mut assembler, &tx, &line).await {
            return;
        }
    }
    if let Some(snapshot) = assembler.finish() {
        tracing::debug!(
            chars = snapshot.content.chars().count(),
            sequence = snapshot.sequence,
            "generation stream complete"
        );
        emit(&tx, StreamEvent::Snapshot(snapshot)).await;
    }
}

/// Apply one decoded line. Returns `false` once the consumer has gone away.
async fn ingest(assembler: &mut Assembler, tx: &mpsc::Sender<StreamEvent>, line: &str) -> bool {
    let event = parse_line(line);
    if let LineEvent::Raw(raw) = &event {
        tracing::debug!(chars = raw.chars().count(), "unrecognised stream line kept as raw text");
    }
    let Some(text) = event.text() else {
        return true;
    };

    let now = Instant::now();
    match assembler.append(text, now) {
        FlushDecision::Now => match assembler.flush(now) {
            Some(snapshot) => emit(tx, StreamEvent::Snapshot(snapshot)).await,
            None => true,
        },
        FlushDecision::Idle | FlushDecision::At(_) | FlushDecision::Pending(_) => true,
    }
}

async fn fail(tx: &mpsc::Sender<StreamEvent>, assembler: &mut Assembler, error: &StreamError) {
    assembler.fail();
    tracing::warn!(error = %error, "generation stream failed");
    emit(
        tx,
        StreamEvent::Failed {
            message: error.consumer_message(),
        },
    )
    .await;
}

async fn emit(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
    tx.send(event).await.is_ok()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

//! Accumulated document state and snapshot throttling.
//!
//! [`Assembler`] is a plain state object: it never reads the clock, every
//! time-dependent method takes `now`. The runtime owns the timer and calls
//! [`Assembler::flush`] when the deadline returned by
//! [`Assembler::append`] elapses.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Markers that must all appear before the document counts as structured.
pub const STRUCTURE_MARKERS: [&str; 3] = ["<html", "<head", "<body"];

/// Minimum spacing between two emitted snapshots.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Designing,
    Structuring,
    Complete,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Designing => write!(f, "designing"),
            Stage::Structuring => write!(f, "structuring"),
            Stage::Complete => write!(f, "complete"),
        }
    }
}

/// An immutable view of the document at one flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSnapshot {
    pub content: Arc<str>,
    pub stage: Stage,
    /// 1-based emission counter; strictly increasing per stream.
    pub sequence: u64,
}

/// What the caller should do after an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDecision {
    /// Nothing was appended, or the stream is already terminal.
    Idle,
    /// The interval has elapsed since the last flush: flush now.
    Now,
    /// A flush was scheduled for this deadline.
    At(Instant),
    /// A flush is already pending at this deadline; the append coalesces into it.
    Pending(Instant),
}

#[derive(Debug)]
pub struct Assembler {
    content: String,
    stage: Stage,
    flush_interval: Duration,
    last_flush: Option<Instant>,
    pending_flush: Option<Instant>,
    sequence: u64,
    terminal: bool,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_INTERVAL)
    }
}

impl Assembler {
    #[must_use]
    pub fn new(flush_interval: Duration) -> Self {
        Self {
            content: String::new(),
            stage: Stage::Designing,
            flush_interval,
            last_flush: None,
            pending_flush: None,
            sequence: 0,
            terminal: false,
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Deadline of the scheduled flush, if one is pending.
    #[must_use]
    pub fn pending_flush(&self) -> Option<Instant> {
        self.pending_flush
    }

    /// Append text and decide when the next snapshot should go out.
    ///
    /// The first append after construction, or after the interval has passed
    /// since the last flush, flushes immediately. Otherwise at most one flush
    /// is kept pending and later appends coalesce into it.
    pub fn append(&mut self, text: &str, now: Instant) -> FlushDecision {
        if self.terminal || text.is_empty() {
            return FlushDecision::Idle;
        }

        self.content.push_str(text);
        if self.stage == Stage::Designing
            && STRUCTURE_MARKERS
                .iter()
                .all(|marker| self.content.contains(marker))
        {
            self.stage = Stage::Structuring;
        }

        if let Some(deadline) = self.pending_flush {
            return FlushDecision::Pending(deadline);
        }
        match self.last_flush {
            Some(last) if now.saturating_duration_since(last) < self.flush_interval => {
                let deadline = last + self.flush_interval;
                self.pending_flush = Some(deadline);
                FlushDecision::At(deadline)
            }
            _ => FlushDecision::Now,
        }
    }

    /// Emit a snapshot of the current content and clear any pending flush.
    ///
    /// Returns `None` once the stream is terminal.
    pub fn flush(&mut self, now: Instant) -> Option<StreamSnapshot> {
        if self.terminal {
            return None;
        }
        self.pending_flush = None;
        self.last_flush = Some(now);
        Some(self.snapshot())
    }

    /// Flush whatever is pending if its deadline has passed.
    pub fn poll_flush(&mut self, now: Instant) -> Option<StreamSnapshot> {
        match self.pending_flush {
            Some(deadline) if deadline <= now => self.flush(now),
            _ => None,
        }
    }

    /// Mark the document complete and return the final snapshot.
    ///
    /// Any pending throttled flush is superseded. Returns `None` if the stream
    /// was already terminal.
    pub fn finish(&mut self) -> Option<StreamSnapshot> {
        if self.terminal {
            return None;
        }
        self.pending_flush = None;
        self.stage = Stage::Complete;
        let snapshot = self.snapshot();
        self.terminal = true;
        Some(snapshot)
    }

    /// Mark the stream failed. Content and stage stay as last flushed.
    pub fn fail(&mut self) {
        self.pending_flush = None;
        self.terminal = true;
    }

    fn snapshot(&mut self) -> StreamSnapshot {
        self.sequence += 1;
        StreamSnapshot {
            content: Arc::from(self.content.as_str()),
            stage: self.stage,
            sequence: self.sequence,
        }
    }
}

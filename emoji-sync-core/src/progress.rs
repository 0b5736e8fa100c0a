//! Progress reporting types for sync operations.
//!
//! The engine reports everything it does as an ordered stream of
//! [`SyncEvent`]s pushed into a [`ProgressSink`]. Delivery is best-effort: the
//! engine never blocks or retries on a sink, and sinks whose consumer has gone
//! away drop events silently.

use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;

/// Final counters of a sync (or bulk delete) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Emojis created (or deleted, for a bulk delete).
    pub success: usize,
    /// Emojis that already existed in the destination.
    pub skipped: usize,
    /// Emojis that failed.
    pub errors: usize,
}

/// Events emitted during a run, serialised with a `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SyncEvent {
    /// Phase announcement.
    Info { message: String },

    /// Non-fatal problem, the run continues.
    Warning { message: String },

    /// About to handle one emoji.
    Progress { emoji_name: String, message: String },

    /// The emoji was created (or deleted).
    Success {
        emoji_name: String,
        original_name: String,
        message: String,
    },

    /// The emoji already exists in the destination.
    Skipped {
        emoji_name: String,
        original_name: String,
        message: String,
    },

    /// Per-item failure, or the single fatal error of an aborted run when
    /// `emoji_name` is absent.
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        emoji_name: Option<String>,
        message: String,
    },

    /// Final counts.
    Summary { message: String, counts: SyncSummary },

    /// Emitted by the caller once the stream is complete.
    Done { message: String },
}

impl SyncEvent {
    /// The wire tag of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::Info { .. } => "info",
            SyncEvent::Warning { .. } => "warning",
            SyncEvent::Progress { .. } => "progress",
            SyncEvent::Success { .. } => "success",
            SyncEvent::Skipped { .. } => "skipped",
            SyncEvent::Error { .. } => "error",
            SyncEvent::Summary { .. } => "summary",
            SyncEvent::Done { .. } => "done",
        }
    }

    /// Source-side emoji name the event refers to, if any.
    pub fn emoji_name(&self) -> Option<&str> {
        match self {
            SyncEvent::Progress { emoji_name, .. } => Some(emoji_name),
            SyncEvent::Success { original_name, .. } | SyncEvent::Skipped { original_name, .. } => {
                Some(original_name)
            }
            SyncEvent::Error { emoji_name, .. } => emoji_name.as_deref(),
            _ => None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        SyncEvent::Info {
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        SyncEvent::Warning {
            message: message.into(),
        }
    }

    pub fn done(message: impl Into<String>) -> Self {
        SyncEvent::Done {
            message: message.into(),
        }
    }
}

/// One-way consumer of [`SyncEvent`]s.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(SyncEvent) + Send + Sync,
{
    fn emit(&self, event: SyncEvent) {
        self(event)
    }
}

/// Sink forwarding events into an unbounded tokio channel.
///
/// Once the receiver is dropped, further events are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: SyncEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::trace!(kind = e.0.kind(), "[PROGRESS] Receiver closed, event dropped");
        }
    }
}

/// Sink that records every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<SyncEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Wire tags of the events received so far, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(SyncEvent::kind).collect()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: SyncEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

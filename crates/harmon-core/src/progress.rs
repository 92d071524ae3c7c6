//! Run-status publication.
//!
//! The pipeline reports progress through a [`StatusChannel`] so the caller
//! decides where it goes: the log, a progress bar, or a queue consumed by
//! another process. Publication must never block or fail the run; a slow or
//! full subscriber loses events instead.

use std::sync::Mutex;
use std::sync::mpsc::{SyncSender, TrySendError};

use tracing::{debug, info, warn};

use harmon_model::Diagnostic;

/// One published status event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Reset { total: usize },
    Progress { count: usize, total: usize },
    Message(Diagnostic),
}

/// Where the pipeline publishes its run status.
pub trait StatusChannel {
    /// A new run is starting with `total` rules to process.
    fn send_reset(&self, total: usize);
    /// `count` of `total` rules have been processed.
    fn send_progress(&self, count: usize, total: usize);
    /// A rule- or value-level problem worth surfacing to the operator.
    fn send_message(&self, diagnostic: &Diagnostic);
}

/// Publishes status straight to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

impl StatusChannel for LogChannel {
    fn send_reset(&self, total: usize) {
        info!(total, "pipeline run starting");
    }

    fn send_progress(&self, count: usize, total: usize) {
        debug!(count, total, "pipeline progress");
    }

    fn send_message(&self, diagnostic: &Diagnostic) {
        warn!(
            schema = diagnostic.schema,
            variable = diagnostic.variable,
            message = diagnostic.message,
            "pipeline message"
        );
    }
}

/// Publishes events over a bounded in-process queue.
///
/// `try_send` keeps the pipeline non-blocking: when the subscriber falls
/// behind, events are dropped rather than stalling rule execution.
#[derive(Debug, Clone)]
pub struct BoundedChannel {
    sender: SyncSender<ProgressEvent>,
}

impl BoundedChannel {
    pub fn new(sender: SyncSender<ProgressEvent>) -> Self {
        Self { sender }
    }

    fn publish(&self, event: ProgressEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                debug!(?event, "status subscriber behind; event dropped");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl StatusChannel for BoundedChannel {
    fn send_reset(&self, total: usize) {
        self.publish(ProgressEvent::Reset { total });
    }

    fn send_progress(&self, count: usize, total: usize) {
        self.publish(ProgressEvent::Progress { count, total });
    }

    fn send_message(&self, diagnostic: &Diagnostic) {
        self.publish(ProgressEvent::Message(diagnostic.clone()));
    }
}

/// Collects every event in memory.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    fn record(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl StatusChannel for MemoryChannel {
    fn send_reset(&self, total: usize) {
        self.record(ProgressEvent::Reset { total });
    }

    fn send_progress(&self, count: usize, total: usize) {
        self.record(ProgressEvent::Progress { count, total });
    }

    fn send_message(&self, diagnostic: &Diagnostic) {
        self.record(ProgressEvent::Message(diagnostic.clone()));
    }
}

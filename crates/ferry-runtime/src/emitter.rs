//! Broadcast-based emitter for pipeline status events.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use ferry_core::events::PipelineEvent;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast-based status event emitter.
///
/// Non-blocking: `emit` never awaits. Slow receivers lag and drop events
/// rather than slowing the pipeline — events are informational only.
pub struct EventEmitter {
    tx: broadcast::Sender<PipelineEvent>,
    emit_count: AtomicU64,
}

impl EventEmitter {
    /// Create a new emitter with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new emitter with a custom channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Emit an event to all subscribers. Returns the receiver count.
    pub fn emit(&self, event: PipelineEvent) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Subscribe as a `Stream` (for streaming transports).
    pub fn stream(&self) -> BroadcastStream<PipelineEvent> {
        BroadcastStream::new(self.subscribe())
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total number of events emitted.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Event bus implementation using tokio broadcast channels
//!
//! Publishing never blocks, so the synchronous lifecycle driver can emit
//! events from the middle of a start or stop cycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::types::{Event, EventEnvelope};

/// Capacity for the broadcast channel
pub const DEFAULT_CAPACITY: usize = 1000;

/// Broadcast bus for lifecycle events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    published: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus retaining at most `capacity` unread events per subscriber.
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wrap `event` in an envelope and publish it.
    ///
    /// Returns the number of subscribers reached; without subscribers the
    /// event is dropped and 0 is returned.
    pub fn emit(&self, event: Event) -> usize {
        self.publish(EventEnvelope::new(event))
    }

    pub fn publish(&self, envelope: EventEnvelope) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Collect every event currently queued on `receiver` without waiting.
    ///
    /// Events lost to lagging are skipped; draining stops at the first empty
    /// or closed read.
    pub fn drain(receiver: &mut broadcast::Receiver<EventEnvelope>) -> Vec<EventEnvelope> {
        let mut drained = Vec::new();
        loop {
            match receiver.try_recv() {
                Ok(envelope) => drained.push(envelope),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        drained
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total number of events published, including dropped ones
    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .field("published_count", &self.published_count())
            .finish()
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use super::AttributeObserver;

/// Which side of a mutation an event was emitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePhase {
    /// Emitted before the binding changes.
    Before,
    /// Emitted after the binding changed.
    After,
}

/// One observed change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The key that changed.
    pub key: String,
    /// Which side of the mutation this event came from.
    pub phase: ChangePhase,
    /// When the observer was called.
    pub at: DateTime<Utc>,
}

/// Observer that forwards notifications into a bounded channel.
///
/// Sending never blocks the mutating thread: when the stream is full or gone
/// the event is dropped and counted.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: Sender<AttributeChange>,
    dropped_events: AtomicU64,
}

impl ChannelObserver {
    /// Creates an observer and the stream that receives its events.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Arc<Self>, ChangeStream) {
        let (tx, rx) = bounded(capacity.max(1));
        let observer = Arc::new(Self {
            tx,
            dropped_events: AtomicU64::new(0),
        });
        (observer, ChangeStream { rx })
    }

    /// Events lost to a full or disconnected stream.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    fn send(&self, key: &str, phase: ChangePhase) {
        let event = AttributeChange {
            key: key.to_string(),
            phase,
            at: Utc::now(),
        };
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl AttributeObserver for ChannelObserver {
    fn before_change(&self, key: &str) {
        self.send(key, ChangePhase::Before);
    }

    fn after_change(&self, key: &str) {
        self.send(key, ChangePhase::After);
    }
}

/// Receiving side of a [`ChannelObserver`].
#[derive(Debug)]
pub struct ChangeStream {
    rx: Receiver<AttributeChange>,
}

impl ChangeStream {
    /// Next event, if one is already queued.
    #[must_use]
    pub fn try_recv(&self) -> Option<AttributeChange> {
        self.rx.try_recv().ok()
    }

    /// Next event, blocking until one arrives.
    ///
    /// Returns `None` once the observer has been dropped and the queue is empty.
    #[must_use]
    pub fn recv(&self) -> Option<AttributeChange> {
        self.rx.recv().ok()
    }

    /// Next event, waiting up to `timeout`.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<AttributeChange> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// All currently queued events.
    #[must_use]
    pub fn drain(&self) -> Vec<AttributeChange> {
        self.rx.try_iter().collect()
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if no event is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

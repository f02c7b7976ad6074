//! Change notification for attribute keys.
//!
//! Collaborators such as a trace or visualization layer implement
//! [`AttributeObserver`] and register it against the keys they care about.
//! Every mutation that actually changes a key's bindings calls
//! `before_change` on each registration for that key before the map changes
//! and `after_change` after it.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bounded-channel observer and its receiving stream.
pub mod channel;
/// Per-key registration bookkeeping.
pub mod registry;

pub use channel::{AttributeChange, ChangePhase, ChangeStream, ChannelObserver};
pub use registry::ObserverRegistry;

/// Listener for changes to the values bound to a key.
///
/// Both hooks default to no-ops. Hooks run synchronously inside the mutating
/// call and must not re-enter the database that is notifying them.
pub trait AttributeObserver: Send + Sync {
    /// Called before `key`'s bindings change.
    fn before_change(&self, key: &str) {
        let _ = key;
    }

    /// Called after `key`'s bindings changed.
    fn after_change(&self, key: &str) {
        let _ = key;
    }
}

/// Unique identifier for one observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverId(Uuid);

impl ObserverId {
    /// Create a new random registration id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for one registration of an observer on a key.
///
/// Registering the same observer twice yields two tokens; notifications for
/// the key continue until both have been handed back.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping the token makes the registration impossible to remove individually"]
pub struct ObserverToken {
    id: ObserverId,
    key: String,
}

impl ObserverToken {
    pub(crate) fn new(key: String) -> Self {
        Self {
            id: ObserverId::new(),
            key,
        }
    }

    /// The registration id.
    #[must_use]
    pub const fn id(&self) -> ObserverId {
        self.id
    }

    /// The key this registration observes.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

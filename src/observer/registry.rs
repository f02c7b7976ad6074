use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AttrError, AttrResult};

use super::{AttributeObserver, ObserverId, ObserverToken};

struct Registration {
    id: ObserverId,
    observer: Arc<dyn AttributeObserver>,
}

/// Observer registrations, grouped by key in registration order.
#[derive(Default)]
pub struct ObserverRegistry {
    by_key: HashMap<String, Vec<Registration>>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer` on `key` and returns the token that undoes it.
    pub fn register(&mut self, key: impl Into<String>, observer: Arc<dyn AttributeObserver>) -> ObserverToken {
        let token = ObserverToken::new(key.into());
        let regs = self.by_key.entry(token.key.clone()).or_default();
        regs.push(Registration {
            id: token.id,
            observer,
        });
        debug!(key = %token.key, id = %token.id, registrations = regs.len(), "observer registered");
        token
    }

    /// Removes the registration behind `token`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObserver` if the registration was already dropped by
    /// [`ObserverRegistry::unregister_all`].
    pub fn unregister(&mut self, token: ObserverToken) -> AttrResult<()> {
        let Some(regs) = self.by_key.get_mut(&token.key) else {
            warn!(key = %token.key, id = %token.id, "unregistering unknown observer");
            return Err(AttrError::UnknownObserver { id: token.id });
        };
        let Some(pos) = regs.iter().position(|r| r.id == token.id) else {
            warn!(key = %token.key, id = %token.id, "unregistering unknown observer");
            return Err(AttrError::UnknownObserver { id: token.id });
        };
        regs.remove(pos);
        if regs.is_empty() {
            self.by_key.remove(&token.key);
        }
        debug!(key = %token.key, id = %token.id, "observer unregistered");
        Ok(())
    }

    /// Removes every registration on `key`, returning how many there were.
    pub fn unregister_all(&mut self, key: &str) -> usize {
        let removed = self.by_key.remove(key).map_or(0, |regs| regs.len());
        if removed > 0 {
            debug!(key, removed, "all observers unregistered");
        }
        removed
    }

    /// Number of live registrations on `key`.
    #[must_use]
    pub fn registrations(&self, key: &str) -> usize {
        self.by_key.get(key).map_or(0, Vec::len)
    }

    /// Number of live registrations of this particular observer on `key`.
    #[must_use]
    pub fn registrations_of(&self, key: &str, observer: &Arc<dyn AttributeObserver>) -> usize {
        self.by_key.get(key).map_or(0, |regs| {
            regs.iter()
                .filter(|r| Arc::ptr_eq(&r.observer, observer))
                .count()
        })
    }

    /// Returns true if no key has registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Calls `before_change` once per registration on `key`.
    pub fn notify_pre(&self, key: &str) {
        if let Some(regs) = self.by_key.get(key) {
            for reg in regs {
                reg.observer.before_change(key);
            }
        }
    }

    /// Calls `after_change` once per registration on `key`.
    pub fn notify_post(&self, key: &str) {
        if let Some(regs) = self.by_key.get(key) {
            for reg in regs {
                reg.observer.after_change(key);
            }
        }
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, regs) in &self.by_key {
            map.entry(key, &regs.len());
        }
        map.finish()
    }
}

//! The attribute database.
//!
//! [`AttributeDatabase`] owns the key → value-set bindings, the observers
//! registered on keys, the live [`QueryChain`] and a one-entry cache of the
//! last query result. Any binding mutation and any push or pop invalidates the
//! cache, so repeated `query()` calls with nothing in between are O(1).
//!
//! One database belongs to one thread of control. Share nothing across
//! threads; see [`crate::context`] for the per-thread instance.

use std::sync::Arc;

use tracing::trace;

use crate::attributes::{AttributeMap, ValueSet};
use crate::config::DatabaseConfig;
use crate::error::AttrResult;
use crate::observer::{AttributeObserver, ObserverRegistry, ObserverToken};
use crate::predicate::Predicate;
use crate::query::{ChainTicket, QueryChain, QueryNode};
use crate::snapshot::AttributeSnapshot;
use crate::value::Value;

/// Counters describing how `query()` calls were answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Calls that walked the chain.
    pub evaluations: u64,
    /// Calls answered from the cache.
    pub cache_hits: u64,
}

#[derive(Debug, Clone, Copy)]
struct QueryCache {
    last: bool,
    valid: bool,
}

/// Attribute bindings, observers and the query chain of one thread of control.
#[derive(Debug)]
pub struct AttributeDatabase {
    config: DatabaseConfig,
    attributes: AttributeMap,
    observers: ObserverRegistry,
    chain: QueryChain,
    cache: QueryCache,
    stats: QueryStats,
}

impl AttributeDatabase {
    /// Creates an empty database with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DatabaseConfig::default())
    }

    /// Creates an empty database using `config`.
    #[must_use]
    pub fn with_config(config: DatabaseConfig) -> Self {
        // An empty chain's answer is known up front.
        let cache = QueryCache {
            last: config.empty_chain_result,
            valid: true,
        };
        Self {
            chain: QueryChain::new(config.max_chain_depth),
            config,
            attributes: AttributeMap::new(),
            observers: ObserverRegistry::new(),
            cache,
            stats: QueryStats::default(),
        }
    }

    /// The configuration this database was created with.
    #[must_use]
    pub const fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Read-only view of the bindings, as consumed by predicates.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// The live query chain.
    #[must_use]
    pub const fn chain(&self) -> &QueryChain {
        &self.chain
    }

    /// The observer registrations.
    #[must_use]
    pub const fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    /// How `query()` calls have been answered so far.
    #[must_use]
    pub const fn stats(&self) -> QueryStats {
        self.stats
    }

    /// Returns true if the next `query()` will be answered from the cache.
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        self.config.cache_queries && self.cache.valid
    }

    /// Number of active query nodes.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.chain.depth()
    }

    /// The active formula in readable form.
    #[must_use]
    pub fn describe_query(&self) -> String {
        self.chain.describe()
    }

    // --- bindings ---

    /// Returns true if `key` is bound to at least one value.
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Values bound to `key`; the empty set if the key is absent.
    #[must_use]
    pub fn get(&self, key: &str) -> &ValueSet {
        self.attributes.get(key)
    }

    /// Adds `value` to `key`'s set. Returns whether the set changed.
    pub fn add(&mut self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let changed = !self.attributes.contains(key, &value);
        if changed {
            self.observers.notify_pre(key);
            self.attributes.insert(key, value);
            self.observers.notify_post(key);
        }
        self.invalidate();
        trace!(key, changed, "attribute added");
        changed
    }

    /// Binds `key` to exactly `{value}`, discarding prior values.
    ///
    /// Unchanged only if the key already held exactly that singleton.
    pub fn replace(&mut self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let changed = !self.attributes.is_exactly(key, &value);
        if changed {
            self.observers.notify_pre(key);
            self.attributes.replace(key, value);
            self.observers.notify_post(key);
        }
        self.invalidate();
        trace!(key, changed, "attribute replaced");
        changed
    }

    /// Removes one value from `key`'s set; removing the last value removes the key.
    pub fn remove_value(&mut self, key: &str, value: &Value) -> bool {
        let changed = self.attributes.contains(key, value);
        if changed {
            self.observers.notify_pre(key);
            self.attributes.remove_value(key, value);
            self.observers.notify_post(key);
        }
        self.invalidate();
        trace!(key, changed, "attribute value removed");
        changed
    }

    /// Removes `key` and all its values.
    pub fn remove(&mut self, key: &str) -> bool {
        let changed = self.attributes.contains_key(key);
        if changed {
            self.observers.notify_pre(key);
            self.attributes.remove_key(key);
            self.observers.notify_post(key);
        }
        self.invalidate();
        trace!(key, changed, "attribute removed");
        changed
    }

    /// Rebinds `key` to a previously captured set, or removes it for `None`.
    pub(crate) fn restore(&mut self, key: &str, previous: Option<ValueSet>) -> bool {
        let changed = self.attributes.values(key) != previous.as_ref();
        if changed {
            self.observers.notify_pre(key);
            self.attributes.set_values(key, previous);
            self.observers.notify_post(key);
        }
        self.invalidate();
        trace!(key, changed, "attribute restored");
        changed
    }

    // --- observers ---

    /// Registers `observer` for changes to `key`.
    pub fn add_observer(&mut self, key: &str, observer: Arc<dyn AttributeObserver>) -> ObserverToken {
        self.observers.register(key, observer)
    }

    /// Removes one registration.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObserver` if the registration was already removed by `remove_all_observers`.
    pub fn remove_observer(&mut self, token: ObserverToken) -> AttrResult<()> {
        self.observers.unregister(token)
    }

    /// Removes every registration on `key`; returns how many were removed.
    pub fn remove_all_observers(&mut self, key: &str) -> usize {
        self.observers.unregister_all(key)
    }

    // --- querying ---

    /// Makes `node` the head of the query chain.
    ///
    /// # Errors
    ///
    /// Returns `ChainDepthExceeded` at the configured depth limit.
    pub fn push(&mut self, node: QueryNode) -> AttrResult<ChainTicket> {
        let ticket = self.chain.push(node)?;
        self.invalidate();
        trace!(depth = self.chain.depth(), "query node pushed");
        Ok(ticket)
    }

    /// Removes the head of the query chain.
    ///
    /// # Errors
    ///
    /// Returns `ChainUnderflow` on an empty chain.
    pub fn pop(&mut self) -> AttrResult<QueryNode> {
        let node = self.chain.pop()?;
        self.invalidate();
        trace!(depth = self.chain.depth(), "query node popped");
        Ok(node)
    }

    /// Removes the node pushed under `ticket`, rejecting out-of-order release.
    ///
    /// # Errors
    ///
    /// Returns `ChainUnderflow` when nodes pushed later are still active.
    pub fn release(&mut self, ticket: ChainTicket) -> AttrResult<QueryNode> {
        let node = self.chain.release(ticket)?;
        self.invalidate();
        trace!(depth = self.chain.depth(), "query node released");
        Ok(node)
    }

    /// Should output be emitted right now?
    ///
    /// Evaluates the chain, or answers `empty_chain_result` (default `true`)
    /// when no query node is active. Errors are not cached.
    ///
    /// # Errors
    ///
    /// Propagates predicate errors such as `TypeMismatch`; the cache is left invalid.
    pub fn query(&mut self) -> AttrResult<bool> {
        if self.is_cached() {
            self.stats.cache_hits += 1;
            trace!(result = self.cache.last, "query cache hit");
            return Ok(self.cache.last);
        }

        self.stats.evaluations += 1;
        let result = self
            .chain
            .evaluate(&self.attributes)?
            .unwrap_or(self.config.empty_chain_result);
        self.cache = QueryCache {
            last: result,
            valid: true,
        };
        trace!(result, depth = self.chain.depth(), "query evaluated");
        Ok(result)
    }

    /// Emission decision for a block that carries its own on/off predicate.
    ///
    /// The block is emitted iff [`query`](Self::query) is true and `onoff`
    /// (if any) holds. Only the chain part is cached.
    ///
    /// # Errors
    ///
    /// Propagates predicate errors from the chain or from `onoff`.
    pub fn query_block(&mut self, onoff: Option<&Predicate>) -> AttrResult<bool> {
        if !self.query()? {
            return Ok(false);
        }
        match onoff {
            Some(predicate) => predicate.apply(&self.attributes),
            None => Ok(true),
        }
    }

    /// Key → display strings view of the current bindings.
    #[must_use]
    pub fn snapshot(&self) -> AttributeSnapshot {
        AttributeSnapshot::capture(&self.attributes)
    }

    fn invalidate(&mut self) {
        self.cache.valid = false;
    }
}

impl Default for AttributeDatabase {
    fn default() -> Self {
        Self::new()
    }
}

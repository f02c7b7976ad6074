//! Scoped bindings and query nodes over an explicit database.
//!
//! [`AttrBinding`] and [`QueryScope`] mutably borrow the database and
//! dereference to it, so nested scopes are created from the enclosing guard:
//!
//! ```
//! use attrgate::{AttributeDatabase, Predicate, QueryNode, Quantifier};
//!
//! let mut db = AttributeDatabase::new();
//! {
//!     let mut level = db.bind("level", 3);
//!     let mut gate = level
//!         .scope(QueryNode::when(Predicate::greater_or_equal("level", 2, Quantifier::Any)))
//!         .unwrap();
//!     assert!(gate.query().unwrap());
//! }
//! assert!(!db.exists("level"));
//! assert_eq!(db.depth(), 0);
//! ```
//!
//! The borrow checker makes out-of-order release impossible through guards.
//! A guard that is leaked instead of dropped leaves its node on the chain;
//! the enclosing query scope detects this when it is released and panics.

use std::ops::{Deref, DerefMut};

use tracing::error;

use crate::attributes::ValueSet;
use crate::database::AttributeDatabase;
use crate::error::{AttrError, AttrResult};
use crate::query::{ChainTicket, QueryNode};
use crate::value::Value;

/// How a scoped binding enters the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindMode {
    /// `replace` on entry; the prior value set is restored on exit.
    Replace,
    /// `add` on entry; the value is removed on exit if this scope inserted it.
    Add,
}

/// What to undo when a scoped binding ends.
#[derive(Debug)]
pub(crate) enum Restore {
    Previous(Option<ValueSet>),
    Added(bool),
}

impl Restore {
    pub(crate) fn acquire(db: &mut AttributeDatabase, key: &str, value: &Value, mode: BindMode) -> Self {
        match mode {
            BindMode::Replace => {
                let previous = db.attributes().values(key).cloned();
                db.replace(key, value.clone());
                Self::Previous(previous)
            }
            BindMode::Add => Self::Added(db.add(key, value.clone())),
        }
    }

    pub(crate) fn release(self, db: &mut AttributeDatabase, key: &str, value: &Value) {
        match self {
            Self::Previous(previous) => {
                db.restore(key, previous);
            }
            Self::Added(true) => {
                db.remove_value(key, value);
            }
            Self::Added(false) => {}
        }
    }

    pub(crate) const fn changed_on_entry(&self) -> Option<bool> {
        match self {
            Self::Previous(_) => None,
            Self::Added(inserted) => Some(*inserted),
        }
    }
}

/// Reports a scoped handle that was released out of nesting order.
///
/// `what` names the handle, e.g. `"query scope"`.
pub(crate) fn release_failed(what: &str, err: &AttrError) {
    if std::thread::panicking() {
        error!(%err, what, "scoped handle released out of order while unwinding");
    } else {
        panic!("{what} released out of order: {err}");
    }
}

/// A key binding that lasts until the guard is dropped.
#[derive(Debug)]
#[must_use = "the binding is undone as soon as the guard is dropped"]
pub struct AttrBinding<'a> {
    db: &'a mut AttributeDatabase,
    key: String,
    value: Value,
    restore: Option<Restore>,
}

impl<'a> AttrBinding<'a> {
    fn new(db: &'a mut AttributeDatabase, key: String, value: Value, mode: BindMode) -> Self {
        let restore = Restore::acquire(db, &key, &value, mode);
        Self {
            db,
            key,
            value,
            restore: Some(restore),
        }
    }

    /// The bound key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The bound value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// For [`BindMode::Add`] bindings, whether entry inserted a new value.
    #[must_use]
    pub fn inserted(&self) -> Option<bool> {
        self.restore.as_ref().and_then(Restore::changed_on_entry)
    }
}

impl Deref for AttrBinding<'_> {
    type Target = AttributeDatabase;

    fn deref(&self) -> &Self::Target {
        &*self.db
    }
}

impl DerefMut for AttrBinding<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.db
    }
}

impl Drop for AttrBinding<'_> {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore.release(self.db, &self.key, &self.value);
        }
    }
}

/// A query node that stays at the head of the chain until the guard is dropped.
#[derive(Debug)]
#[must_use = "the query node is popped as soon as the guard is dropped"]
pub struct QueryScope<'a> {
    db: &'a mut AttributeDatabase,
    ticket: ChainTicket,
}

impl QueryScope<'_> {
    /// Depth of the chain below this scope's node.
    #[must_use]
    pub const fn base_depth(&self) -> usize {
        self.ticket.depth()
    }
}

impl Deref for QueryScope<'_> {
    type Target = AttributeDatabase;

    fn deref(&self) -> &Self::Target {
        &*self.db
    }
}

impl DerefMut for QueryScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.db
    }
}

impl Drop for QueryScope<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.db.release(self.ticket) {
            release_failed("query scope", &err);
        }
    }
}

impl AttributeDatabase {
    /// Binds `key` to exactly `{value}` until the guard drops, then restores
    /// the previous set (or removes the key if it was unbound).
    pub fn bind(&mut self, key: impl Into<String>, value: impl Into<Value>) -> AttrBinding<'_> {
        AttrBinding::new(self, key.into(), value.into(), BindMode::Replace)
    }

    /// Adds `value` to `key` until the guard drops.
    ///
    /// On drop the value is removed only if this binding inserted it.
    pub fn bind_additional(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> AttrBinding<'_> {
        AttrBinding::new(self, key.into(), value.into(), BindMode::Add)
    }

    /// Pushes `node` until the guard drops.
    ///
    /// # Errors
    ///
    /// Returns `ChainDepthExceeded` at the configured depth limit.
    pub fn scope(&mut self, node: QueryNode) -> AttrResult<QueryScope<'_>> {
        let ticket = self.push(node)?;
        Ok(QueryScope { db: self, ticket })
    }
}

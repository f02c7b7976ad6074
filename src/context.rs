//! The per-thread attribute database.
//!
//! Instrumented code that cannot thread an [`AttributeDatabase`] through its
//! call sites uses the instance owned by the current thread. Each thread gets
//! its own bindings, observers and query chain; nothing is shared.
//!
//! Lifecycle:
//! - [`install`] replaces this thread's database with a fresh one using the
//!   given configuration (init).
//! - [`reset`] replaces it with a fresh default database (teardown).
//!
//! Both refuse to run while [`ScopedAttr`] or [`ScopedQuery`] handles are
//! alive on the thread. Handles are `!Send`, so a handle is always released
//! on the thread whose database it changed. Each kind of handle must be
//! dropped in reverse creation order; anything else panics.
//!
//! Observer hooks run while the database is borrowed and must not call back
//! into this module.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;

use crate::config::DatabaseConfig;
use crate::database::AttributeDatabase;
use crate::error::{AttrError, AttrResult};
use crate::predicate::Predicate;
use crate::query::{ChainTicket, QueryNode};
use crate::scope::{release_failed, BindMode, Restore};
use crate::value::Value;

thread_local! {
    static CURRENT: RefCell<AttributeDatabase> = RefCell::new(AttributeDatabase::new());
    /// Number of live `ScopedAttr` handles on this thread.
    static BINDINGS: Cell<usize> = const { Cell::new(0) };
}

/// Runs `f` with this thread's database.
///
/// # Panics
///
/// Panics if called re-entrantly, e.g. from inside an observer hook.
pub fn with<R>(f: impl FnOnce(&mut AttributeDatabase) -> R) -> R {
    CURRENT.with(|db| f(&mut db.borrow_mut()))
}

/// Replaces this thread's database with an empty one using `config`.
///
/// # Errors
///
/// Returns `ScopesActive` while any scoped handle is alive on this thread.
pub fn install(config: DatabaseConfig) -> AttrResult<()> {
    let bindings = BINDINGS.with(Cell::get);
    with(|db| {
        if db.depth() > 0 || bindings > 0 {
            return Err(AttrError::ScopesActive {
                queries: db.depth(),
                bindings,
            });
        }
        *db = AttributeDatabase::with_config(config);
        Ok(())
    })
}

/// Drops this thread's bindings, observers and configuration.
///
/// # Errors
///
/// Returns `ScopesActive` while any scoped handle is alive on this thread.
pub fn reset() -> AttrResult<()> {
    install(DatabaseConfig::default())
}

/// Emission decision for this thread. See [`AttributeDatabase::query`].
///
/// # Errors
///
/// Propagates predicate errors from the chain, e.g. `TypeMismatch`.
pub fn query() -> AttrResult<bool> {
    with(AttributeDatabase::query)
}

/// See [`AttributeDatabase::query_block`].
///
/// # Errors
///
/// Propagates predicate errors from the chain or from `onoff`.
pub fn query_block(onoff: Option<&Predicate>) -> AttrResult<bool> {
    with(|db| db.query_block(onoff))
}

/// A binding on this thread's database that lasts until the handle is dropped.
#[derive(Debug)]
#[must_use = "the binding is undone as soon as the handle is dropped"]
pub struct ScopedAttr {
    key: String,
    value: Value,
    restore: Option<Restore>,
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl ScopedAttr {
    /// Binds `key` to exactly `{value}`; the previous set returns on drop.
    pub fn replace(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key.into(), value.into(), BindMode::Replace)
    }

    /// Adds `value` to `key`; removed on drop if this handle inserted it.
    pub fn add(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key.into(), value.into(), BindMode::Add)
    }

    fn new(key: String, value: Value, mode: BindMode) -> Self {
        let restore = with(|db| Restore::acquire(db, &key, &value, mode));
        let depth = BINDINGS.with(|live| {
            let depth = live.get();
            live.set(depth + 1);
            depth
        });
        Self {
            key,
            value,
            restore: Some(restore),
            depth,
            _not_send: PhantomData,
        }
    }

    /// The key this handle bound.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value this handle bound.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }
}

impl Drop for ScopedAttr {
    fn drop(&mut self) {
        let Some(restore) = self.restore.take() else {
            return;
        };
        // The thread-locals may already be gone during thread teardown.
        let Ok(live) = BINDINGS.try_with(|live| {
            let current = live.get();
            live.set(current.min(self.depth));
            current
        }) else {
            return;
        };
        let expected_depth = self.depth + 1;
        if live != expected_depth {
            // A later binding is still live; restoring now would clobber it.
            release_failed(
                "attribute binding",
                &AttrError::BindingUnderflow {
                    expected_depth,
                    actual_depth: live,
                },
            );
            return;
        }
        let _ = CURRENT.try_with(|db| restore.release(&mut db.borrow_mut(), &self.key, &self.value));
    }
}

/// A query node on this thread's chain that lasts until the handle is dropped.
///
/// Handles must be dropped in reverse creation order; anything else panics.
#[derive(Debug)]
#[must_use = "the query node is popped as soon as the handle is dropped"]
pub struct ScopedQuery {
    ticket: ChainTicket,
    _not_send: PhantomData<*const ()>,
}

impl ScopedQuery {
    /// Pushes `node` onto this thread's chain.
    ///
    /// # Errors
    ///
    /// Returns `ChainDepthExceeded` when the chain is already at its configured limit.
    pub fn new(node: QueryNode) -> AttrResult<Self> {
        let ticket = with(|db| db.push(node))?;
        Ok(Self {
            ticket,
            _not_send: PhantomData,
        })
    }

    /// Pushes an `And` node.
    ///
    /// # Errors
    ///
    /// As [`ScopedQuery::new`].
    pub fn and(predicate: Predicate) -> AttrResult<Self> {
        Self::new(QueryNode::and(predicate))
    }

    /// Pushes an `Or` node.
    ///
    /// # Errors
    ///
    /// As [`ScopedQuery::new`].
    pub fn or(predicate: Predicate) -> AttrResult<Self> {
        Self::new(QueryNode::or(predicate))
    }

    /// Pushes an `If` node.
    ///
    /// # Errors
    ///
    /// As [`ScopedQuery::new`].
    pub fn when(predicate: Predicate) -> AttrResult<Self> {
        Self::new(QueryNode::when(predicate))
    }

    /// Pushes a constant `True` node.
    ///
    /// # Errors
    ///
    /// As [`ScopedQuery::new`].
    pub fn always() -> AttrResult<Self> {
        Self::new(QueryNode::always())
    }

    /// Pushes a constant `False` node.
    ///
    /// # Errors
    ///
    /// As [`ScopedQuery::new`].
    pub fn never() -> AttrResult<Self> {
        Self::new(QueryNode::never())
    }
}

impl Drop for ScopedQuery {
    fn drop(&mut self) {
        let released = CURRENT.try_with(|db| db.borrow_mut().release(self.ticket).map(drop));
        if let Ok(Err(err)) = released {
            release_failed("query scope", &err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Quantifier;

    // Every test runs on its own thread, so each sees a fresh database.

    #[test]
    fn test_default_emits() {
        assert!(query().unwrap());
    }

    #[test]
    fn test_scoped_handles() {
        let level = ScopedAttr::replace("level", 3);
        assert_eq!(level.key(), "level");
        let gate = ScopedQuery::when(Predicate::greater_or_equal("level", 2, Quantifier::Any)).unwrap();
        assert!(query().unwrap());
        with(|db| db.replace("level", 1));
        assert!(!query().unwrap());
        drop(gate);
        drop(level);
        assert!(query().unwrap());
        assert!(!with(|db| db.exists("level")));
    }

    #[test]
    fn test_install_refused_with_active_scope() {
        let gate = ScopedQuery::never().unwrap();
        assert_eq!(
            install(DatabaseConfig::default()),
            Err(AttrError::ScopesActive {
                queries: 1,
                bindings: 0
            })
        );
        drop(gate);
        install(DatabaseConfig::default().with_empty_chain_result(false)).unwrap();
        assert!(!query().unwrap());
        reset().unwrap();
        assert!(query().unwrap());
    }

    #[test]
    #[should_panic(expected = "released out of order")]
    fn test_out_of_order_drop_panics() {
        let outer = ScopedQuery::always().unwrap();
        let _inner = ScopedQuery::never().unwrap();
        drop(outer);
    }

    #[test]
    #[should_panic(expected = "attribute binding released out of order")]
    fn test_out_of_order_binding_drop_panics() {
        let outer = ScopedAttr::replace("k", 1);
        let _inner = ScopedAttr::replace("k", 2);
        drop(outer);
    }

    #[test]
    fn test_install_refused_with_live_binding() {
        with(|db| db.replace("k", 0));
        let handle = ScopedAttr::replace("k", 1);
        assert_eq!(
            reset(),
            Err(AttrError::ScopesActive {
                queries: 0,
                bindings: 1
            })
        );
        drop(handle);
        assert!(with(|db| db.get("k").contains(&Value::from(0))));
        reset().unwrap();
        assert!(!with(|db| db.exists("k")));
    }
}

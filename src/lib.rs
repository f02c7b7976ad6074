//! # attrgate - attribute-gated debug output
//!
//! attrgate decides, cheaply and at run time, whether an instrumented program
//! should emit a block of debug or trace output. The program binds named facts
//! (attributes) and declares nested query scopes over them; the emission layer
//! asks [`AttributeDatabase::query`] before producing each block.
//!
//! ## Core Concepts
//!
//! - **Value**: text, object identity, integer or float bound to a key
//! - **Predicate**: a keyed comparison quantified over all values of the key
//! - **Query chain**: `And` / `Or` / `If` / `True` / `False` nodes pushed by
//!   nested scopes, evaluated from the most recent one down
//! - **Observer**: a listener notified before and after a key's values change
//!
//! ## Usage
//!
//! ```rust
//! use attrgate::{AttributeDatabase, Predicate, Quantifier, QueryNode};
//!
//! let mut db = AttributeDatabase::new();
//! let mut level = db.bind("level", 3);
//!
//! // Emit only while the debug level is at least 2.
//! let mut gate = level
//!     .scope(QueryNode::when(Predicate::greater_or_equal("level", 2, Quantifier::Any)))
//!     .unwrap();
//! assert!(gate.query().unwrap());
//!
//! gate.replace("level", 1);
//! assert!(!gate.query().unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attributes;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod observer;
pub mod predicate;
pub mod query;
pub mod scope;
pub mod snapshot;
pub mod value;

// Re-export primary types at crate root for convenience
pub use attributes::{AttributeMap, ValueSet};
pub use config::DatabaseConfig;
pub use context::{ScopedAttr, ScopedQuery};
pub use database::{AttributeDatabase, QueryStats};
pub use error::{AttrError, AttrResult};
pub use observer::{
    AttributeChange, AttributeObserver, ChangePhase, ChangeStream, ChannelObserver, ObserverId,
    ObserverRegistry, ObserverToken,
};
pub use predicate::{Comparison, Predicate, Quantifier};
pub use query::{ChainTicket, Condition, NodeKind, QueryChain, QueryNode};
pub use scope::{AttrBinding, BindMode, QueryScope};
pub use snapshot::AttributeSnapshot;
pub use value::{Identity, Value, ValueKind};

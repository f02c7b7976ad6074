//! Query formulas built from nested scopes.
//!
//! A [`QueryChain`] is a stack of [`QueryNode`]s. The head (most recently
//! pushed node) combines its own condition with the result of the nodes below
//! it:
//!
//! - `And`: `cond && below` (an empty remainder counts as `true`)
//! - `Or`: `cond || below` (an empty remainder counts as `false`)
//! - `If`: `cond`; nodes below are never consulted
//! - `True` / `False`: constant; nodes below are never consulted
//!
//! The chain therefore encodes
//! `(keyN opN valN) LogOpN ((keyN-1 ...) LogOpN-1 (... LogOp1 True))`.
//! Nodes are stored in a vector and released strictly in LIFO order; every
//! push hands out a [`ChainTicket`] recording the depth it was pushed at, and
//! releasing through a ticket verifies the head is still that node.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeMap;
use crate::error::{AttrError, AttrResult};
use crate::predicate::Predicate;

/// The boolean test attached to a query node.
///
/// [`Predicate`] is the standard implementation. Hosts may supply their own
/// conditions, e.g. to count evaluations.
pub trait Condition: fmt::Debug {
    /// Evaluates the condition against the current bindings.
    ///
    /// # Errors
    ///
    /// Implementations report evaluation failures such as `TypeMismatch`.
    fn apply(&self, attributes: &AttributeMap) -> AttrResult<bool>;

    /// Human-readable form used by [`QueryChain::describe`].
    fn describe(&self) -> String {
        format!("{self:?}")
    }
}

impl Condition for Predicate {
    fn apply(&self, attributes: &AttributeMap) -> AttrResult<bool> {
        Predicate::apply(self, attributes)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// How a node combines its condition with its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Own condition and the predecessor's result.
    And,
    /// Own condition or the predecessor's result.
    Or,
    /// Own condition only; the predecessor is ignored.
    If,
    /// Always true; the predecessor is ignored.
    True,
    /// Always false; the predecessor is ignored.
    False,
}

impl NodeKind {
    /// Returns true if nodes of this kind read their predecessor.
    #[must_use]
    pub const fn consults_predecessor(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::If => write!(f, "if"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
        }
    }
}

/// One term of a query formula.
#[derive(Debug)]
pub struct QueryNode {
    kind: NodeKind,
    condition: Box<dyn Condition>,
}

impl QueryNode {
    /// Creates a node of `kind` testing `predicate`.
    ///
    /// The predicate is kept but never applied for `True` and `False` nodes.
    #[must_use]
    pub fn new(kind: NodeKind, predicate: Predicate) -> Self {
        Self::with_condition(kind, Box::new(predicate))
    }

    /// Creates a node from an arbitrary condition.
    #[must_use]
    pub fn with_condition(kind: NodeKind, condition: Box<dyn Condition>) -> Self {
        Self { kind, condition }
    }

    /// `predicate && <rest of the chain>`.
    #[must_use]
    pub fn and(predicate: Predicate) -> Self {
        Self::new(NodeKind::And, predicate)
    }

    /// `predicate || <rest of the chain>`.
    #[must_use]
    pub fn or(predicate: Predicate) -> Self {
        Self::new(NodeKind::Or, predicate)
    }

    /// `predicate`, ignoring the rest of the chain.
    #[must_use]
    pub fn when(predicate: Predicate) -> Self {
        Self::new(NodeKind::If, predicate)
    }

    /// Constant `true`, ignoring the rest of the chain.
    #[must_use]
    pub fn always() -> Self {
        Self::new(NodeKind::True, Predicate::null())
    }

    /// Constant `false`, ignoring the rest of the chain.
    #[must_use]
    pub fn never() -> Self {
        Self::new(NodeKind::False, Predicate::null())
    }

    /// How this node combines with its predecessor.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The condition tested by `And`, `Or` and `If` nodes.
    #[must_use]
    pub fn condition(&self) -> &dyn Condition {
        self.condition.as_ref()
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.consults_predecessor() || self.kind == NodeKind::If {
            write!(f, "{} {}", self.kind, self.condition.describe())
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// Proof of a push, consumed when the node is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a pushed query node must be released through its ticket"]
pub struct ChainTicket {
    depth: usize,
}

impl ChainTicket {
    /// Chain depth below the pushed node.
    #[must_use]
    pub const fn depth(self) -> usize {
        self.depth
    }
}

/// Stack of query nodes; the last element is the head.
#[derive(Debug)]
pub struct QueryChain {
    nodes: Vec<QueryNode>,
    max_depth: usize,
}

impl QueryChain {
    /// Creates an empty chain that accepts at most `max_depth` nodes.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            nodes: Vec::new(),
            max_depth,
        }
    }

    /// Number of nodes on the chain.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The most recently pushed node.
    #[must_use]
    pub fn head(&self) -> Option<&QueryNode> {
        self.nodes.last()
    }

    /// Iterates nodes from the deepest to the head.
    pub fn iter(&self) -> impl Iterator<Item = &QueryNode> {
        self.nodes.iter()
    }

    /// Makes `node` the new head.
    ///
    /// # Errors
    ///
    /// Returns `ChainDepthExceeded` when the chain already holds `max_depth` nodes.
    pub fn push(&mut self, node: QueryNode) -> AttrResult<ChainTicket> {
        if self.nodes.len() >= self.max_depth {
            return Err(AttrError::ChainDepthExceeded {
                max_depth: self.max_depth,
            });
        }
        let ticket = ChainTicket {
            depth: self.nodes.len(),
        };
        self.nodes.push(node);
        Ok(ticket)
    }

    /// Removes the head, whichever scope pushed it.
    ///
    /// # Errors
    ///
    /// Returns `ChainUnderflow` on an empty chain.
    pub fn pop(&mut self) -> AttrResult<QueryNode> {
        self.nodes.pop().ok_or(AttrError::ChainUnderflow {
            expected_depth: 1,
            actual_depth: 0,
        })
    }

    /// Removes the node pushed under `ticket`.
    ///
    /// # Errors
    ///
    /// Returns `ChainUnderflow` unless that node is the current head, i.e.
    /// every node pushed after it has already been released.
    pub fn release(&mut self, ticket: ChainTicket) -> AttrResult<QueryNode> {
        let expected_depth = ticket.depth + 1;
        if self.nodes.len() != expected_depth {
            return Err(AttrError::ChainUnderflow {
                expected_depth,
                actual_depth: self.nodes.len(),
            });
        }
        self.pop()
    }

    /// Evaluates the formula from the head down.
    ///
    /// Returns `None` for an empty chain.
    ///
    /// # Errors
    ///
    /// Propagates the first condition error met while walking the chain.
    pub fn evaluate(&self, attributes: &AttributeMap) -> AttrResult<Option<bool>> {
        let mut idx = self.nodes.len();
        while idx > 0 {
            idx -= 1;
            let node = &self.nodes[idx];
            match node.kind {
                NodeKind::True => return Ok(Some(true)),
                NodeKind::False => return Ok(Some(false)),
                NodeKind::If => return node.condition.apply(attributes).map(Some),
                NodeKind::And => {
                    if !node.condition.apply(attributes)? {
                        return Ok(Some(false));
                    }
                    if idx == 0 {
                        return Ok(Some(true));
                    }
                }
                NodeKind::Or => {
                    if node.condition.apply(attributes)? {
                        return Ok(Some(true));
                    }
                    if idx == 0 {
                        return Ok(Some(false));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Renders the formula, e.g. `(b == 2 [any]) or ((a == 1 [any]) and (true))`.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.nodes.is_empty() {
            return "true".to_string();
        }
        let mut text = String::new();
        let mut open = 0usize;
        for (idx, node) in self.nodes.iter().enumerate().rev() {
            match node.kind {
                NodeKind::True => text.push_str("true"),
                NodeKind::False => text.push_str("false"),
                NodeKind::If => text.push_str(&node.condition.describe()),
                NodeKind::And | NodeKind::Or => {
                    let _ = write!(text, "({}) {} (", node.condition.describe(), node.kind);
                    open += 1;
                    if idx == 0 {
                        text.push_str(if node.kind == NodeKind::And { "true" } else { "false" });
                    }
                    continue;
                }
            }
            break;
        }
        text.extend(std::iter::repeat(')').take(open));
        text
    }
}

impl Default for QueryChain {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_CHAIN_DEPTH)
    }
}

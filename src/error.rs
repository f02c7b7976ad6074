//! Error types for attrgate.
//!
//! Errors are strongly typed using thiserror. Type and chain-discipline errors
//! are reported to the instrumenting application; they are never folded into a
//! default emission decision.

use thiserror::Error;

use crate::observer::ObserverId;
use crate::value::ValueKind;

/// Errors raised by the attribute engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttrError {
    /// A value was read or compared as a kind it does not hold.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The kind the caller asked for or compared against.
        expected: ValueKind,
        /// The kind actually stored.
        found: ValueKind,
    },

    /// A value was decoded with a tag that names no known kind.
    #[error("Unknown value kind '{tag}'")]
    UnknownValueKind {
        /// The unrecognised tag.
        tag: String,
    },

    /// A query node was popped without a matching push, or out of nesting order.
    #[error("Query chain underflow: expected depth {expected_depth}, found {actual_depth}")]
    ChainUnderflow {
        /// Depth the releasing scope expected the chain to have.
        expected_depth: usize,
        /// Depth the chain actually had.
        actual_depth: usize,
    },

    /// A scoped attribute binding was released while a later one was still live.
    #[error("Attribute binding underflow: expected depth {expected_depth}, found {actual_depth}")]
    BindingUnderflow {
        /// Number of live bindings the releasing handle expected.
        expected_depth: usize,
        /// Number of live bindings actually recorded.
        actual_depth: usize,
    },

    /// Pushing another node would exceed the configured chain depth.
    #[error("Query chain depth limit of {max_depth} exceeded")]
    ChainDepthExceeded {
        /// Configured maximum.
        max_depth: usize,
    },

    /// A predicate was constructed with operands it cannot use.
    #[error("Invalid predicate: {reason}")]
    InvalidPredicate {
        /// Why the predicate was rejected.
        reason: String,
    },

    /// An observer token did not match any live registration.
    #[error("Observer registration not found: {id}")]
    UnknownObserver {
        /// Id carried by the stale token.
        id: ObserverId,
    },

    /// The per-thread database was reinitialised while scoped handles were live.
    #[error(
        "Cannot reinitialise attributes while {queries} query scope(s) and {bindings} binding(s) are active"
    )]
    ScopesActive {
        /// Chain depth at the time of the call.
        queries: usize,
        /// Live scoped attribute bindings at the time of the call.
        bindings: usize,
    },

    /// Encoding or decoding failed.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Underlying error text.
        message: String,
    },
}

impl AttrError {
    /// Creates a type mismatch error.
    #[must_use]
    pub const fn type_mismatch(expected: ValueKind, found: ValueKind) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Creates a serialization error from any displayable cause.
    #[must_use]
    pub fn serialization(cause: impl std::fmt::Display) -> Self {
        Self::Serialization {
            message: cause.to_string(),
        }
    }

    /// Returns true if this is a type mismatch.
    #[must_use]
    pub const fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Returns true if the query chain's push/pop discipline was broken.
    #[must_use]
    pub const fn is_chain_violation(&self) -> bool {
        matches!(
            self,
            Self::ChainUnderflow { .. }
                | Self::BindingUnderflow { .. }
                | Self::ChainDepthExceeded { .. }
                | Self::ScopesActive { .. }
        )
    }

    /// Returns true if the error reflects a broken program invariant rather than bad input.
    ///
    /// Fatal errors indicate the emission decisions of the host can no longer be trusted.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::ChainUnderflow { .. }
            | Self::BindingUnderflow { .. }
            | Self::UnknownValueKind { .. } => true,
            Self::TypeMismatch { .. }
            | Self::ChainDepthExceeded { .. }
            | Self::InvalidPredicate { .. }
            | Self::UnknownObserver { .. }
            | Self::ScopesActive { .. }
            | Self::Serialization { .. } => false,
        }
    }
}

impl From<serde_json::Error> for AttrError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}

/// Result type alias for attrgate operations.
pub type AttrResult<T> = Result<T, AttrError>;

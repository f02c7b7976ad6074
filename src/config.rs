//! Database configuration.

use serde::{Deserialize, Serialize};

use crate::error::AttrResult;

/// Default bound on the number of nested query nodes.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 1024;

/// Tunables for an [`AttributeDatabase`](crate::database::AttributeDatabase).
///
/// All fields default, so a host can load a partial JSON document:
///
/// ```
/// use attrgate::DatabaseConfig;
///
/// let cfg = DatabaseConfig::from_json(r#"{"max_chain_depth": 16}"#).unwrap();
/// assert_eq!(cfg.max_chain_depth, 16);
/// assert!(cfg.cache_queries);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Reuse the last query result until the bindings or the chain change.
    pub cache_queries: bool,
    /// Result of `query()` when no query scope is active.
    pub empty_chain_result: bool,
    /// Maximum number of nested query nodes.
    pub max_chain_depth: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            cache_queries: true,
            empty_chain_result: true,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }
}

impl DatabaseConfig {
    /// Parses a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed JSON or mistyped fields.
    pub fn from_json(json: &str) -> AttrResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enables or disables result caching.
    #[must_use]
    pub const fn with_cache_queries(mut self, cache_queries: bool) -> Self {
        self.cache_queries = cache_queries;
        self
    }

    /// Sets the answer for an empty chain.
    #[must_use]
    pub const fn with_empty_chain_result(mut self, result: bool) -> Self {
        self.empty_chain_result = result;
        self
    }

    /// Sets the chain depth limit.
    #[must_use]
    pub const fn with_max_chain_depth(mut self, max_chain_depth: usize) -> Self {
        self.max_chain_depth = max_chain_depth;
        self
    }
}

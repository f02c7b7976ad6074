//! Boundary view of the attribute database.
//!
//! A snapshot maps each key to the display strings of its bound values, for
//! embedding in generated reports. The JSON encoding is a convenience; its
//! exact layout is not a stable format.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attributes::AttributeMap;
use crate::error::AttrResult;

/// Key → display strings, taken at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    /// When the snapshot was captured.
    pub taken_at: DateTime<Utc>,
    /// Display strings of each key's values, in value order.
    pub entries: BTreeMap<String, Vec<String>>,
}

impl AttributeSnapshot {
    /// Captures the current bindings of `attributes`.
    #[must_use]
    pub fn capture(attributes: &AttributeMap) -> Self {
        let entries = attributes
            .iter()
            .map(|(key, values)| (key.to_string(), values.iter().map(ToString::to_string).collect()))
            .collect();
        Self {
            taken_at: Utc::now(),
            entries,
        }
    }

    /// Display strings bound to `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compact JSON encoding.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> AttrResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Indented JSON encoding.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json_pretty(&self) -> AttrResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

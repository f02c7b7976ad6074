//! Keyed predicates over bound attribute values.
//!
//! A [`Predicate`] names a key, a [`Comparison`] and a [`Quantifier`]. It is
//! applied to the full value set bound to its key: with [`Quantifier::Any`] the
//! comparison must hold for at least one value, with [`Quantifier::All`] for
//! every value. An absent key makes every predicate false except
//! [`Comparison::Null`], which is always true.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeMap;
use crate::error::{AttrError, AttrResult};
use crate::value::Value;

/// How a comparison is combined over the values bound to a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    /// At least one value must satisfy the comparison.
    #[default]
    Any,
    /// Every value must satisfy the comparison.
    All,
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::All => write!(f, "all"),
        }
    }
}

/// The test a predicate performs on each bound value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Comparison {
    /// Always true, even for absent keys.
    Null,
    /// Bound value equals `value`.
    Equal {
        /// Comparison operand.
        value: Value,
    },
    /// Bound value differs from `value`.
    NotEqual {
        /// Comparison operand.
        value: Value,
    },
    /// Bound value is less than `value`.
    LessThan {
        /// Comparison operand.
        value: Value,
    },
    /// Bound value is less than or equal to `value`.
    LessOrEqual {
        /// Comparison operand.
        value: Value,
    },
    /// Bound value is greater than `value`.
    GreaterThan {
        /// Comparison operand.
        value: Value,
    },
    /// Bound value is greater than or equal to `value`.
    GreaterOrEqual {
        /// Comparison operand.
        value: Value,
    },
    /// Numeric bound value lies in `[lower, upper)`.
    Range {
        /// Inclusive lower bound.
        lower: Value,
        /// Exclusive upper bound.
        upper: Value,
    },
}

impl Comparison {
    /// Tests a single bound value.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` when `stored` is not of the operand's kind.
    pub fn holds(&self, stored: &Value) -> AttrResult<bool> {
        match self {
            Self::Null => Ok(true),
            Self::Equal { value } => stored.equals(value),
            Self::NotEqual { value } => stored.not_equals(value),
            Self::LessThan { value } => stored.less_than(value),
            Self::LessOrEqual { value } => stored.less_or_equal(value),
            Self::GreaterThan { value } => stored.greater_than(value),
            Self::GreaterOrEqual { value } => stored.greater_or_equal(value),
            Self::Range { lower, upper } => {
                Ok(stored.greater_or_equal(lower)? && stored.less_than(upper)?)
            }
        }
    }

    fn validate(&self) -> AttrResult<()> {
        if let Self::Range { lower, upper } = self {
            if !lower.is_numeric() || !upper.is_numeric() {
                return Err(AttrError::InvalidPredicate {
                    reason: format!(
                        "range bounds must be numeric, got {} and {}",
                        lower.kind(),
                        upper.kind()
                    ),
                });
            }
            if lower.kind() != upper.kind() {
                return Err(AttrError::InvalidPredicate {
                    reason: format!(
                        "range bounds must share a kind, got {} and {}",
                        lower.kind(),
                        upper.kind()
                    ),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Equal { value } => write!(f, "== {value}"),
            Self::NotEqual { value } => write!(f, "!= {value}"),
            Self::LessThan { value } => write!(f, "< {value}"),
            Self::LessOrEqual { value } => write!(f, "<= {value}"),
            Self::GreaterThan { value } => write!(f, "> {value}"),
            Self::GreaterOrEqual { value } => write!(f, ">= {value}"),
            Self::Range { lower, upper } => write!(f, "in [{lower}, {upper})"),
        }
    }
}

/// A keyed, quantified comparison. Immutable once constructed.
///
/// # Examples
///
/// ```
/// use attrgate::{AttributeDatabase, Predicate, Quantifier};
///
/// let mut db = AttributeDatabase::new();
/// db.add("x", 1);
/// db.add("x", 3);
///
/// let below_two = Predicate::less_than("x", 2, Quantifier::Any);
/// assert!(below_two.apply(db.attributes()).unwrap());
/// let all_below_two = Predicate::less_than("x", 2, Quantifier::All);
/// assert!(!all_below_two.apply(db.attributes()).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPredicate")]
pub struct Predicate {
    key: String,
    quantifier: Quantifier,
    comparison: Comparison,
}

#[derive(Deserialize)]
struct RawPredicate {
    key: String,
    #[serde(default)]
    quantifier: Quantifier,
    comparison: Comparison,
}

impl TryFrom<RawPredicate> for Predicate {
    type Error = AttrError;

    fn try_from(raw: RawPredicate) -> Result<Self, Self::Error> {
        Self::new(raw.key, raw.comparison, raw.quantifier)
    }
}

impl Predicate {
    /// Creates a predicate, validating the comparison operands.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPredicate` if range bounds are not numeric or differ in kind.
    pub fn new(
        key: impl Into<String>,
        comparison: Comparison,
        quantifier: Quantifier,
    ) -> AttrResult<Self> {
        comparison.validate()?;
        Ok(Self {
            key: key.into(),
            quantifier,
            comparison,
        })
    }

    fn unchecked(key: impl Into<String>, comparison: Comparison, quantifier: Quantifier) -> Self {
        Self {
            key: key.into(),
            quantifier,
            comparison,
        }
    }

    /// The always-true predicate.
    #[must_use]
    pub fn null() -> Self {
        Self::unchecked(String::new(), Comparison::Null, Quantifier::Any)
    }

    /// Any or every bound value equals `value`.
    #[must_use]
    pub fn equal(key: impl Into<String>, value: impl Into<Value>, quantifier: Quantifier) -> Self {
        Self::unchecked(key, Comparison::Equal { value: value.into() }, quantifier)
    }

    /// Any or every bound value differs from `value`.
    #[must_use]
    pub fn not_equal(key: impl Into<String>, value: impl Into<Value>, quantifier: Quantifier) -> Self {
        Self::unchecked(key, Comparison::NotEqual { value: value.into() }, quantifier)
    }

    /// Any or every bound value is below `value`.
    #[must_use]
    pub fn less_than(key: impl Into<String>, value: impl Into<Value>, quantifier: Quantifier) -> Self {
        Self::unchecked(key, Comparison::LessThan { value: value.into() }, quantifier)
    }

    /// Any or every bound value is at most `value`.
    #[must_use]
    pub fn less_or_equal(
        key: impl Into<String>,
        value: impl Into<Value>,
        quantifier: Quantifier,
    ) -> Self {
        Self::unchecked(key, Comparison::LessOrEqual { value: value.into() }, quantifier)
    }

    /// Any or every bound value is above `value`.
    #[must_use]
    pub fn greater_than(
        key: impl Into<String>,
        value: impl Into<Value>,
        quantifier: Quantifier,
    ) -> Self {
        Self::unchecked(key, Comparison::GreaterThan { value: value.into() }, quantifier)
    }

    /// Any or every bound value is at least `value`.
    #[must_use]
    pub fn greater_or_equal(
        key: impl Into<String>,
        value: impl Into<Value>,
        quantifier: Quantifier,
    ) -> Self {
        Self::unchecked(key, Comparison::GreaterOrEqual { value: value.into() }, quantifier)
    }

    /// Creates a range predicate `lower <= v < upper`.
    ///
    /// Both bounds must be numeric and of the same kind.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPredicate` for non-numeric or mixed-kind bounds.
    pub fn range(
        key: impl Into<String>,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
        quantifier: Quantifier,
    ) -> AttrResult<Self> {
        Self::new(
            key,
            Comparison::Range {
                lower: lower.into(),
                upper: upper.into(),
            },
            quantifier,
        )
    }

    /// The key this predicate tests.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// How the comparison combines over the bound values.
    #[must_use]
    pub const fn quantifier(&self) -> Quantifier {
        self.quantifier
    }

    /// The per-value test.
    #[must_use]
    pub const fn comparison(&self) -> &Comparison {
        &self.comparison
    }

    /// Evaluates the predicate against the current bindings.
    ///
    /// Every bound value is tested, so a kind mismatch anywhere in the set is
    /// reported even if another value already decided the outcome.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if any bound value differs in kind from the comparison operand.
    pub fn apply(&self, attributes: &AttributeMap) -> AttrResult<bool> {
        if matches!(self.comparison, Comparison::Null) {
            return Ok(true);
        }
        let Some(values) = attributes.values(&self.key) else {
            return Ok(false);
        };

        let mut matched = 0usize;
        for value in values {
            if self.comparison.holds(value)? {
                matched += 1;
            }
        }

        Ok(match self.quantifier {
            Quantifier::Any => matched > 0,
            Quantifier::All => matched == values.len(),
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.comparison {
            Comparison::Null => write!(f, "null"),
            _ => write!(f, "{} {} [{}]", self.key, self.comparison, self.quantifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    fn bound(key: &str, values: &[Value]) -> AttributeMap {
        let mut map = AttributeMap::new();
        for v in values {
            map.insert(key, v.clone());
        }
        map
    }

    #[test]
    fn test_null_is_true_for_absent_key() {
        let map = AttributeMap::new();
        assert!(Predicate::null().apply(&map).unwrap());
    }

    #[test]
    fn test_absent_key_is_false() {
        let map = AttributeMap::new();
        assert!(!Predicate::equal("k", 1, Quantifier::Any).apply(&map).unwrap());
        assert!(!Predicate::not_equal("k", 1, Quantifier::All).apply(&map).unwrap());
        let range = Predicate::range("k", 0, 10, Quantifier::Any).unwrap();
        assert!(!range.apply(&map).unwrap());
    }

    #[test]
    fn test_any_and_all() {
        let map = bound("x", &[Value::from(1), Value::from(2), Value::from(3)]);
        assert!(Predicate::greater_than("x", 2, Quantifier::Any).apply(&map).unwrap());
        assert!(!Predicate::greater_than("x", 2, Quantifier::All).apply(&map).unwrap());
        assert!(Predicate::not_equal("x", 4, Quantifier::All).apply(&map).unwrap());
        assert!(Predicate::less_or_equal("x", 3, Quantifier::All).apply(&map).unwrap());
    }

    #[test]
    fn test_range_upper_bound_exclusive() {
        let range = Predicate::range("temp", 10.0, 20.0, Quantifier::Any).unwrap();
        assert!(range.apply(&bound("temp", &[Value::from(10.0)])).unwrap());
        assert!(range.apply(&bound("temp", &[Value::from(19.999)])).unwrap());
        assert!(!range.apply(&bound("temp", &[Value::from(20.0)])).unwrap());
        assert!(!range.apply(&bound("temp", &[Value::from(9.5)])).unwrap());
    }

    #[test]
    fn test_range_rejects_bad_bounds() {
        assert!(matches!(
            Predicate::range("k", "a", "z", Quantifier::Any),
            Err(AttrError::InvalidPredicate { .. })
        ));
        assert!(matches!(
            Predicate::range("k", 1, 2.0, Quantifier::Any),
            Err(AttrError::InvalidPredicate { .. })
        ));
    }

    #[test]
    fn test_kind_mismatch_surfaces() {
        let map = bound("level", &["high".into()]);
        let err = Predicate::greater_or_equal("level", 2, Quantifier::Any)
            .apply(&map)
            .unwrap_err();
        assert_eq!(err, AttrError::type_mismatch(ValueKind::Integer, ValueKind::Text));

        let range = Predicate::range("level", 1, 5, Quantifier::Any).unwrap();
        assert!(range.apply(&bound("level", &[Value::from(2.0)])).is_err());
    }

    #[test]
    fn test_mismatch_not_hidden_by_any() {
        let map = bound("x", &[Value::from(1), "one".into()]);
        assert!(Predicate::equal("x", 1, Quantifier::Any).apply(&map).is_err());
    }

    #[test]
    fn test_display() {
        let p = Predicate::greater_or_equal("level", 2, Quantifier::Any);
        assert_eq!(p.to_string(), "level >= 2 [any]");
        let r = Predicate::range("temp", 10, 20, Quantifier::All).unwrap();
        assert_eq!(r.to_string(), "temp in [10, 20) [all]");
        assert_eq!(Predicate::null().to_string(), "null");
    }

    #[test]
    fn test_predicate_serialization() {
        let p = Predicate::less_than("x", 5, Quantifier::All);
        let json = serde_json::to_string(&p).unwrap();
        let back: Predicate = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn test_deserialize_validates_range() {
        let json = r#"{
            "key": "k",
            "comparison": {
                "type": "range",
                "lower": {"type": "text", "value": "a"},
                "upper": {"type": "text", "value": "b"}
            }
        }"#;
        assert!(serde_json::from_str::<Predicate>(json).is_err());
    }
}

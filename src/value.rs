//! Values that can be bound to attribute keys.
//!
//! A [`Value`] holds exactly one of four kinds: text, an opaque identity
//! (an address compared by equality, never dereferenced), a signed integer or
//! a float. Set membership uses a total order across kinds; the relational
//! comparisons used by predicates only accept operands of the same kind.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{AttrError, AttrResult};

/// The kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// UTF-8 text.
    Text,
    /// Opaque object identity.
    Identity,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
}

impl ValueKind {
    /// Returns true for the kinds accepted by range predicates.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// The prefix used by [`Value::to_tagged_string`].
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Identity => "ptr",
            Self::Integer => "int",
            Self::Float => "float",
        }
    }

    fn from_tag(tag: &str) -> AttrResult<Self> {
        match tag {
            "text" => Ok(Self::Text),
            "ptr" => Ok(Self::Identity),
            "int" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            other => Err(AttrError::UnknownValueKind {
                tag: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Identity => write!(f, "identity"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
        }
    }
}

/// Opaque identity of an object in the instrumented program.
///
/// Only the address is kept; two identities are equal iff they name the same
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(usize);

impl Identity {
    /// Captures the address of `target`.
    #[must_use]
    pub fn of<T: ?Sized>(target: &T) -> Self {
        Self((target as *const T).cast::<()>() as usize)
    }

    /// Wraps a raw address.
    #[must_use]
    pub const fn from_address(address: usize) -> Self {
        Self(address)
    }

    /// The wrapped address.
    #[must_use]
    pub const fn address(self) -> usize {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A value bound to an attribute key.
///
/// # Examples
///
/// ```
/// use attrgate::{Value, ValueKind};
///
/// let level = Value::from(3);
/// assert_eq!(level.kind(), ValueKind::Integer);
/// assert!(level.less_than(&Value::from(5)).unwrap());
/// assert!(level.less_than(&Value::from("five")).is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// A string, such as a phase name.
    Text(String),
    /// The address-derived identity of some object.
    Identity(Identity),
    /// A signed integer.
    Integer(i64),
    /// A floating point number, ordered by `total_cmp`.
    Float(f64),
}

impl Value {
    /// Identity of `target`, as a value.
    #[must_use]
    pub fn identity_of<T: ?Sized>(target: &T) -> Self {
        Self::Identity(Identity::of(target))
    }

    /// Returns the kind of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Identity(_) => ValueKind::Identity,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
        }
    }

    /// Returns true for a text value.
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Returns true for an identity value.
    pub const fn is_identity(&self) -> bool {
        matches!(self, Self::Identity(_))
    }

    /// Returns true for an integer value.
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Integer(_))
    }

    /// Returns true for a float value.
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    /// Returns true for integer and float values.
    pub const fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }

    /// Returns the text, or `TypeMismatch` if this is not a text value.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if this is not a text value.
    pub fn as_text(&self) -> AttrResult<&str> {
        match self {
            Self::Text(v) => Ok(v.as_str()),
            other => Err(AttrError::type_mismatch(ValueKind::Text, other.kind())),
        }
    }

    /// Returns the identity.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if this is not an identity value.
    pub fn as_identity(&self) -> AttrResult<Identity> {
        match self {
            Self::Identity(v) => Ok(*v),
            other => Err(AttrError::type_mismatch(ValueKind::Identity, other.kind())),
        }
    }

    /// Returns the integer.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if this is not an integer value.
    pub fn as_integer(&self) -> AttrResult<i64> {
        match self {
            Self::Integer(v) => Ok(*v),
            other => Err(AttrError::type_mismatch(ValueKind::Integer, other.kind())),
        }
    }

    /// Returns the float. Integers are not widened.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if this is not a float value.
    pub fn as_float(&self) -> AttrResult<f64> {
        match self {
            Self::Float(v) => Ok(*v),
            other => Err(AttrError::type_mismatch(ValueKind::Float, other.kind())),
        }
    }

    /// Compares two values of the same kind by their natural order.
    ///
    /// `other` is treated as the reference operand: a kind mismatch reports
    /// `other`'s kind as expected and this value's kind as found.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the two values are of different kinds.
    pub fn try_cmp(&self, other: &Self) -> AttrResult<Ordering> {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => Ok(a.cmp(b)),
            (Self::Identity(a), Self::Identity(b)) => Ok(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Ok(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => Ok(a.total_cmp(b)),
            _ => Err(AttrError::type_mismatch(other.kind(), self.kind())),
        }
    }

    /// `self == other` for values of the same kind.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the two values are of different kinds.
    pub fn equals(&self, other: &Self) -> AttrResult<bool> {
        Ok(self.try_cmp(other)? == Ordering::Equal)
    }

    /// `self != other` for values of the same kind.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the two values are of different kinds.
    pub fn not_equals(&self, other: &Self) -> AttrResult<bool> {
        Ok(self.try_cmp(other)? != Ordering::Equal)
    }

    /// `self < other` for values of the same kind.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the two values are of different kinds.
    pub fn less_than(&self, other: &Self) -> AttrResult<bool> {
        Ok(self.try_cmp(other)? == Ordering::Less)
    }

    /// `self <= other` for values of the same kind.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the two values are of different kinds.
    pub fn less_or_equal(&self, other: &Self) -> AttrResult<bool> {
        Ok(self.try_cmp(other)? != Ordering::Greater)
    }

    /// `self > other` for values of the same kind.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the two values are of different kinds.
    pub fn greater_than(&self, other: &Self) -> AttrResult<bool> {
        Ok(self.try_cmp(other)? == Ordering::Greater)
    }

    /// `self >= other` for values of the same kind.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the two values are of different kinds.
    pub fn greater_or_equal(&self, other: &Self) -> AttrResult<bool> {
        Ok(self.try_cmp(other)? != Ordering::Less)
    }

    /// Encodes the value with its kind, e.g. `int:3` or `text:warm`.
    ///
    /// The output is accepted by [`Value::parse_tagged`].
    #[must_use]
    pub fn to_tagged_string(&self) -> String {
        format!("{}:{self}", self.kind().tag())
    }

    /// Decodes a string produced by [`Value::to_tagged_string`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownValueKind` for a missing or unknown prefix and `Serialization` for a malformed payload.
    pub fn parse_tagged(encoded: &str) -> AttrResult<Self> {
        let (tag, payload) = encoded.split_once(':').ok_or_else(|| AttrError::UnknownValueKind {
            tag: encoded.to_string(),
        })?;

        match ValueKind::from_tag(tag)? {
            ValueKind::Text => Ok(Self::Text(payload.to_string())),
            ValueKind::Identity => {
                let hex = payload.strip_prefix("0x").unwrap_or(payload);
                usize::from_str_radix(hex, 16)
                    .map(|address| Self::Identity(Identity::from_address(address)))
                    .map_err(AttrError::serialization)
            }
            ValueKind::Integer => payload
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(AttrError::serialization),
            ValueKind::Float => payload
                .parse::<f64>()
                .map(Self::Float)
                .map_err(AttrError::serialization),
        }
    }

    fn storage_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Identity(a), Self::Identity(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (a, b) => a.kind().cmp(&b.kind()),
        }
    }
}

// Equality and ordering below define set membership: values of different
// kinds are unequal and order by kind; floats use the IEEE total order.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.storage_cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.storage_cmp(other)
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Self::Text(v) => v.hash(state),
            Self::Identity(v) => v.hash(state),
            Self::Integer(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => write!(f, "{v}"),
            Self::Identity(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Identity> for Value {
    fn from(v: Identity) -> Self {
        Self::Identity(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

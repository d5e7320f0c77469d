//! Dynamically typed property values and their type tags.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// The payload of a configuration property.
///
/// Serialized untagged, so a `Value` reads and writes as plain JSON/TOML data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(BTreeMap<String, Value>),
}

/// Type tag of a [`Value`], used to declare property constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Dict,
    /// Matches every value.
    Any,
}

impl Kind {
    /// Returns the kind of a concrete value (never [`Kind::Any`]).
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Int(_) => Self::Int,
            Value::Float(_) => Self::Float,
            Value::Str(_) => Self::Str,
            Value::List(_) => Self::List,
            Value::Dict(_) => Self::Dict,
        }
    }

    /// Strict match: `int` does not accept `bool` and `float` does not accept `int`.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        self == Self::Any || self == Self::of(value)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "None",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    #[must_use]
    pub const fn kind(&self) -> Kind {
        Kind::of(self)
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_dict(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Dict(map) => Some(map),
            _ => None,
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

/// Literal form, readable back by [`crate::literal::parse_literal`].
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write_quoted(f, s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            },
            Self::Dict(map) => {
                f.write_str("{")?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, key)?;
                    write!(f, ": {item}")?;
                }
                f.write_str("}")
            },
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<PathBuf> for Value {
    fn from(v: PathBuf) -> Self {
        Self::Str(v.to_string_lossy().into_owned())
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<BTreeMap<String, T>> for Value {
    fn from(v: BTreeMap<String, T>) -> Self {
        Self::Dict(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// Typed extraction of a [`Value`], used by `get_as` reads.
pub trait FromValue: Sized {
    /// # Errors
    /// Returns [`ConfigError::Validation`] naming `property` when the value has another shape.
    fn from_value(property: &str, value: Value) -> Result<Self, ConfigError>;
}

fn mismatch(property: &str, expected: &str, value: &Value) -> ConfigError {
    ConfigError::validation(
        property,
        format!("expected {expected}, but the value is {} `{value}`", value.kind()),
    )
}

impl FromValue for Value {
    fn from_value(_: &str, value: Value) -> Result<Self, ConfigError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(property: &str, value: Value) -> Result<Self, ConfigError> {
        value.as_bool().ok_or_else(|| mismatch(property, "bool", &value))
    }
}

impl FromValue for i64 {
    fn from_value(property: &str, value: Value) -> Result<Self, ConfigError> {
        value.as_int().ok_or_else(|| mismatch(property, "int", &value))
    }
}

impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_value(property: &str, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(i) => Ok(i as Self),
            other => Err(mismatch(property, "float", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(property: &str, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch(property, "str", &other)),
        }
    }
}

impl FromValue for PathBuf {
    fn from_value(property: &str, value: Value) -> Result<Self, ConfigError> {
        String::from_value(property, value).map(Self::from)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(property: &str, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::List(items) => items.into_iter().map(|v| T::from_value(property, v)).collect(),
            other => Err(mismatch(property, "list", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(property: &str, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(property, other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(property: &str, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Dict(map) => {
                map.into_iter().map(|(k, v)| Ok((k, T::from_value(property, v)?))).collect()
            },
            other => Err(mismatch(property, "dict", &other)),
        }
    }
}

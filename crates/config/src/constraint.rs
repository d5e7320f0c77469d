//! Declared type constraints of properties and the string coercion that targets them.

use crate::error::ConfigError;
use crate::literal::parse_literal;
use crate::value::{Kind, Value};
use std::fmt;

/// What a property accepts.
///
/// Constraints are plain data declared next to the property; nothing is inferred at run time.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// A single kind, e.g. `Type(Kind::Int)`.
    Type(Kind),
    /// Any of the listed kinds, e.g. `Union(vec![Kind::Int, Kind::Float])`.
    Union(Vec<Kind>),
    /// A closed set of allowed values.
    OneOf(Vec<Value>),
}

impl Constraint {
    /// `None | kind`.
    #[must_use]
    pub fn optional(kind: Kind) -> Self {
        Self::Union(vec![Kind::Null, kind])
    }

    /// Closed set of values, converted with `Into<Value>`.
    #[must_use]
    pub fn one_of<T: Into<Value>>(options: impl IntoIterator<Item = T>) -> Self {
        Self::OneOf(options.into_iter().map(Into::into).collect())
    }

    /// Rejects declarations that can never be satisfied or are ambiguous.
    ///
    /// # Errors
    /// Returns [`ConfigError::Construction`] for empty unions/enumerations and duplicate options.
    pub fn check_declaration(&self, property: &str) -> Result<(), ConfigError> {
        match self {
            Self::Type(_) => Ok(()),
            Self::Union(kinds) if kinds.is_empty() => Err(ConfigError::construction(format!(
                "property '{property}' declares an empty union"
            ))),
            Self::Union(_) => Ok(()),
            Self::OneOf(options) if options.is_empty() => Err(ConfigError::construction(format!(
                "property '{property}' declares an empty set of options"
            ))),
            Self::OneOf(options) => {
                for (i, option) in options.iter().enumerate() {
                    if options[..i].contains(option) {
                        return Err(ConfigError::construction(format!(
                            "property '{property}' lists option `{option}` more than once"
                        )));
                    }
                }
                Ok(())
            },
        }
    }

    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Type(kind) => kind.matches(value),
            Self::Union(kinds) => kinds.iter().any(|k| k.matches(value)),
            Self::OneOf(options) => options.contains(value),
        }
    }

    /// Checks `value` for `property`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] naming the property and, depending on the constraint,
    /// the allowed types and offered type, or the offered value and allowed options.
    pub fn check(&self, property: &str, value: &Value) -> Result<(), ConfigError> {
        if self.accepts(value) {
            return Ok(());
        }
        let message = match self {
            Self::Type(_) | Self::Union(_) => format!(
                "allowed types are {}, but the offered value `{value}` is of type {}",
                self.describe(),
                value.kind()
            ),
            Self::OneOf(_) => {
                format!("`{value}` is not one of the allowed options {}", self.describe())
            },
        };
        Err(ConfigError::validation(property, message))
    }

    #[must_use]
    pub fn allows_null(&self) -> bool {
        self.accepts(&Value::Null)
    }

    /// Human readable form: `int`, `None | dict`, `{1, 2, 3}`.
    #[must_use]
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Upper-case value placeholder for CLI usage lines: `INT`, `NONE|DICT`, `1|2|3`.
    #[must_use]
    pub fn placeholder(&self) -> String {
        match self {
            Self::Type(kind) => kind.name().to_ascii_uppercase(),
            Self::Union(kinds) => {
                kinds.iter().map(|k| k.name().to_ascii_uppercase()).collect::<Vec<_>>().join("|")
            },
            Self::OneOf(options) => options
                .iter()
                .map(|o| o.as_str().map_or_else(|| o.to_string(), str::to_owned))
                .collect::<Vec<_>>()
                .join("|"),
        }
    }

    /// Converts a single command-line (or environment) token into a value for this constraint.
    ///
    /// * `bool`: only case-insensitive `true` / `false`.
    /// * `int` / `float`: numeric parse of the declared type (`float` also takes `666`).
    /// * `list` / `dict`: structured literal of that shape.
    /// * `None` / `none`: null, when the constraint allows null.
    /// * `str`: the raw token.
    /// * anything else (`any`, unions, options): the token read as a literal where it parses and
    ///   fits, otherwise the raw string; the result must satisfy the constraint. Unions holding
    ///   `bool` or `float` fall back to that kind's rule before the raw string.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] (validation or literal) describing why the token is rejected.
    pub fn coerce(&self, property: &str, token: &str) -> Result<Value, ConfigError> {
        if self.allows_null() && matches!(token, "None" | "none") {
            return Ok(Value::Null);
        }

        let value = match self {
            Self::Type(kind) => coerce_kind(*kind, property, token)?,
            Self::Union(kinds) => {
                let literal = parse_literal(token).ok().filter(|v| self.accepts(v));
                literal.unwrap_or_else(|| {
                    [Kind::Bool, Kind::Float]
                        .into_iter()
                        .filter(|kind| kinds.contains(kind))
                        .find_map(|kind| coerce_kind(kind, property, token).ok())
                        .unwrap_or_else(|| Value::from(token))
                })
            },
            Self::OneOf(_) => {
                parse_literal(token).ok().filter(|v| self.accepts(v)).unwrap_or_else(|| token.into())
            },
        };

        self.check(property, &value)?;
        Ok(value)
    }
}

fn coerce_kind(kind: Kind, property: &str, token: &str) -> Result<Value, ConfigError> {
    let trimmed = token.trim();
    match kind {
        Kind::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(ConfigError::validation(
                property,
                format!("expected `true` or `false`, got `{token}`"),
            )),
        },
        Kind::Int => trimmed.parse::<i64>().map(Value::Int).map_err(|e| {
            ConfigError::validation(property, format!("`{token}` is not an integer: {e}"))
        }),
        Kind::Float => trimmed.parse::<f64>().map(Value::Float).map_err(|e| {
            ConfigError::validation(property, format!("`{token}` is not a number: {e}"))
        }),
        Kind::Str => Ok(Value::from(token)),
        Kind::Null => match trimmed {
            "None" | "none" | "null" => Ok(Value::Null),
            _ => Err(ConfigError::validation(property, format!("expected None, got `{token}`"))),
        },
        Kind::List | Kind::Dict => {
            let value = parse_literal(token).map_err(|e| e.with_note(format!("--{property}")))?;
            if kind.matches(&value) {
                Ok(value)
            } else {
                Err(ConfigError::validation(
                    property,
                    format!("expected a {kind} literal, got {} `{value}`", value.kind()),
                ))
            }
        },
        Kind::Any => Ok(parse_literal(token).unwrap_or_else(|_| Value::from(token))),
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(kind) => write!(f, "{kind}"),
            Self::Union(kinds) => {
                let names: Vec<_> = kinds.iter().map(|k| k.name()).collect();
                f.write_str(&names.join(" | "))
            },
            Self::OneOf(options) => {
                let names: Vec<_> = options.iter().map(ToString::to_string).collect();
                write!(f, "{{{}}}", names.join(", "))
            },
        }
    }
}

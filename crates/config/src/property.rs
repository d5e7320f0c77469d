//! # Property descriptor
//!
//! A [`PropertyDef`] declares one named, typed, validated setting: its [`Constraint`], an
//! optional description (the CLI help text) and a default provider. Definitions are immutable and
//! shared between copies of a tree; each tree instance keeps its own slot per property.
//!
//! Two kinds of default provider exist:
//!
//! * a **value provider** is evaluated once, lazily, on the first read after construction or
//!   reset;
//! * a **computed provider** receives a [`Resolver`] for the owning tree and is evaluated on every
//!   read, so it follows the properties it reads.
//!
//! ```rust
//! # use dtk_config::{Constraint, Kind, PropertyDef, Value};
//! let def = PropertyDef::builder("int_arg", Constraint::Type(Kind::Int))
//!     .description("An integer argument.")
//!     .default_value(123)
//!     .build()
//!     .unwrap();
//! assert_eq!(def.name(), "int_arg");
//! ```

use crate::constraint::Constraint;
use crate::error::ConfigError;
use crate::node::Resolver;
use crate::value::Value;
use private::Sealed;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

type ComputeFn = dyn Fn(&Resolver<'_>) -> Result<Value, ConfigError> + Send + Sync;
type ValueFn = dyn Fn() -> Value + Send + Sync;

/// A function of the configuration tree, shared by reference between copies.
#[derive(Clone)]
pub struct Computed(Arc<ComputeFn>);

impl Computed {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Resolver<'_>) -> Result<Value, ConfigError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn evaluate(&self, resolver: &Resolver<'_>) -> Result<Value, ConfigError> {
        (self.0)(resolver)
    }

    /// `true` when both handles point at the same function.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Computed(..)")
    }
}

/// What can be written into a property.
#[derive(Debug, Clone)]
pub enum Setting {
    Value(Value),
    Computed(Computed),
}

impl Setting {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Resolver<'_>) -> Result<Value, ConfigError> + Send + Sync + 'static,
    {
        Self::Computed(Computed::new(f))
    }
}

impl From<Value> for Setting {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<Computed> for Setting {
    fn from(c: Computed) -> Self {
        Self::Computed(c)
    }
}

macro_rules! setting_from {
    ($($ty:ty),* $(,)?) => {
        $(impl From<$ty> for Setting {
            fn from(v: $ty) -> Self {
                Self::Value(v.into())
            }
        })*
    };
}

setting_from!(bool, i64, i32, f64, &str, String);

#[derive(Clone)]
enum DefaultProvider {
    Value(Arc<ValueFn>),
    Computed(Computed),
}

impl fmt::Debug for DefaultProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value(..)"),
            Self::Computed(c) => c.fmt(f),
        }
    }
}

/// Immutable declaration of a property.
pub struct PropertyDef {
    name: String,
    constraint: Constraint,
    description: Option<String>,
    default: DefaultProvider,
}

impl fmt::Debug for PropertyDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDef")
            .field("name", &self.name)
            .field("constraint", &self.constraint)
            .field("description", &self.description)
            .field("computed", &self.is_computed())
            .finish()
    }
}

impl PropertyDef {
    pub fn builder(
        name: impl Into<String>,
        constraint: Constraint,
    ) -> PropertyDefBuilder<NoDefault> {
        PropertyDefBuilder {
            name: name.into(),
            constraint,
            description: None,
            default: None,
            eager_check: None,
            state: PhantomData,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `true` when the default is computed from other properties.
    #[must_use]
    pub const fn is_computed(&self) -> bool {
        matches!(self.default, DefaultProvider::Computed(_))
    }

    /// Checks a candidate value against the declared constraint without writing it.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] naming this property.
    pub fn validate(&self, value: &Value) -> Result<(), ConfigError> {
        self.constraint.check(&self.name, value)
    }
}

/// Builder state: no default provider yet, `build()` is unavailable.
#[derive(Debug)]
pub struct NoDefault;
/// Builder state: a default provider was given.
#[derive(Debug)]
pub struct WithDefault;

mod private {
    pub trait Sealed {}
}
impl Sealed for NoDefault {}
impl Sealed for WithDefault {}

#[derive(Debug)]
pub struct PropertyDefBuilder<S: Sealed> {
    name: String,
    constraint: Constraint,
    description: Option<String>,
    default: Option<DefaultProvider>,
    eager_check: Option<Value>,
    state: PhantomData<S>,
}

impl<S: Sealed> PropertyDefBuilder<S> {
    /// Help text shown next to the `--<name>` flag.
    #[must_use = "The builder must be finished with build()."]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn with_default(
        self,
        default: DefaultProvider,
        eager_check: Option<Value>,
    ) -> PropertyDefBuilder<WithDefault> {
        PropertyDefBuilder {
            name: self.name,
            constraint: self.constraint,
            description: self.description,
            default: Some(default),
            eager_check,
            state: PhantomData,
        }
    }
}

impl PropertyDefBuilder<NoDefault> {
    /// A constant default, checked against the constraint by `build()`.
    pub fn default_value(self, value: impl Into<Value>) -> PropertyDefBuilder<WithDefault> {
        let value = value.into();
        let shared = value.clone();
        self.with_default(DefaultProvider::Value(Arc::new(move || shared.clone())), Some(value))
    }

    /// A default produced by `f` on the first read; its output is validated then.
    pub fn default_with<F>(self, f: F) -> PropertyDefBuilder<WithDefault>
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.with_default(DefaultProvider::Value(Arc::new(f)), None)
    }

    /// A default computed from the tree on every read.
    pub fn computed<F>(self, f: F) -> PropertyDefBuilder<WithDefault>
    where
        F: Fn(&Resolver<'_>) -> Result<Value, ConfigError> + Send + Sync + 'static,
    {
        self.with_default(DefaultProvider::Computed(Computed::new(f)), None)
    }
}

impl PropertyDefBuilder<WithDefault> {
    /// # Errors
    /// Returns [`ConfigError::Construction`] for an invalid name or constraint declaration, and
    /// [`ConfigError::Validation`] when a constant default breaks the constraint.
    pub fn build(self) -> Result<PropertyDef, ConfigError> {
        check_name(&self.name)?;
        self.constraint.check_declaration(&self.name)?;
        if let Some(value) = &self.eager_check {
            self.constraint.check(&self.name, value)?;
        }
        let default = self.default.ok_or("default provider missing in a finished builder")?;

        Ok(PropertyDef {
            name: self.name,
            constraint: self.constraint,
            description: self.description,
            default,
        })
    }
}

/// Property names double as `--<name>` flags and flat-dictionary keys.
fn check_name(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-')) {
        Ok(())
    } else {
        Err(ConfigError::construction(format!(
            "'{name}' is not a valid property name (letters, digits, '_' and '-', \
             starting with a letter or '_')"
        )))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Default(OnceLock<Value>),
    Set(Setting),
}

/// Per-instance state of a property: its shared definition and the current slot.
#[derive(Debug, Clone)]
pub(crate) struct Property {
    def: Arc<PropertyDef>,
    slot: Slot,
}

impl Property {
    pub(crate) fn new(def: PropertyDef) -> Self {
        Self { def: Arc::new(def), slot: Slot::Default(OnceLock::new()) }
    }

    pub(crate) fn def(&self) -> &PropertyDef {
        &self.def
    }

    pub(crate) fn name(&self) -> &str {
        &self.def.name
    }

    /// Resolves the current value. Computed output is validated on every read.
    pub(crate) fn read(&self, resolver: &Resolver<'_>) -> Result<Value, ConfigError> {
        let value = match &self.slot {
            Slot::Set(Setting::Value(value)) => return Ok(value.clone()),
            Slot::Set(Setting::Computed(computed)) => computed.evaluate(resolver)?,
            Slot::Default(cell) => match &self.def.default {
                DefaultProvider::Computed(computed) => computed.evaluate(resolver)?,
                DefaultProvider::Value(provider) => {
                    if let Some(value) = cell.get() {
                        return Ok(value.clone());
                    }
                    let value = provider();
                    self.def.validate(&value)?;
                    return Ok(cell.get_or_init(|| value).clone());
                },
            },
        };
        self.def.validate(&value)?;
        Ok(value)
    }

    /// Replaces the slot; the caller is responsible for validating `setting` first.
    pub(crate) fn write(&mut self, setting: Setting) -> Slot {
        std::mem::replace(&mut self.slot, Slot::Set(setting))
    }

    pub(crate) fn restore(&mut self, slot: Slot) {
        self.slot = slot;
    }

    pub(crate) fn reset(&mut self) {
        self.slot = Slot::Default(OnceLock::new());
    }

    pub(crate) const fn is_default(&self) -> bool {
        matches!(self.slot, Slot::Default(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Kind;

    #[test]
    fn names_are_checked() {
        for good in ["int_arg", "_private", "dry-run", "a1"] {
            assert!(check_name(good).is_ok(), "{good}");
        }
        for bad in ["", "1st", "--flag", "with space", "dot.ted", "ünï"] {
            assert!(check_name(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn constant_default_is_checked_at_build() {
        let err = PropertyDef::builder("int_arg", Constraint::Type(Kind::Int))
            .default_value("not an int")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }), "{err}");
    }

    #[test]
    fn empty_union_fails_build() {
        let err = PropertyDef::builder("u", Constraint::Union(vec![]))
            .default_value(Value::Null)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Construction { .. }), "{err}");
    }

    #[test]
    fn builder_keeps_metadata() {
        let def = PropertyDef::builder("flag", Constraint::Type(Kind::Bool))
            .description("Toggle it.")
            .computed(|_| Ok(Value::Bool(true)))
            .build()
            .unwrap();
        assert_eq!(def.description(), Some("Toggle it."));
        assert!(def.is_computed());
        assert!(def.validate(&Value::Bool(false)).is_ok());
        assert!(def.validate(&Value::Int(0)).is_err());
    }

    #[test]
    fn setting_conversions() {
        assert!(matches!(Setting::from(3), Setting::Value(Value::Int(3))));
        assert!(matches!(Setting::from("x"), Setting::Value(Value::Str(_))));
        let c = Computed::new(|_| Ok(Value::Null));
        let Setting::Computed(shared) = Setting::from(c.clone()) else { panic!("computed") };
        assert!(shared.ptr_eq(&c));
    }
}

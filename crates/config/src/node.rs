//! # Config node
//!
//! A [`ConfigNode`] owns a list of properties and named child nodes. The tree is declared once
//! through [`ConfigNode::builder`] and then read and written by property name: names are unique
//! across the whole tree, so `get("int_arg")` finds the property wherever it lives.
//!
//! ```rust
//! # use dtk_config::{ConfigNode, Constraint, Kind, PropertyDef, Value};
//! let mut node = ConfigNode::builder("args")
//!     .property(PropertyDef::builder("int_arg", Constraint::Type(Kind::Int)).default_value(123))
//!     .child(
//!         ConfigNode::builder("sub")
//!             .property(PropertyDef::builder("on_sub", Constraint::Type(Kind::Bool)).default_value(false)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! node.set("on_sub", true).unwrap();
//! let flat = node.get_dict().unwrap();
//! assert_eq!(flat.keys().collect::<Vec<_>>(), ["int_arg", "on_sub"]);
//! assert_eq!(flat.get("on_sub"), Some(&Value::Bool(true)));
//! ```

use crate::error::ConfigError;
use crate::flat::FlatDict;
use crate::property::{Property, PropertyDef, PropertyDefBuilder, Setting, WithDefault};
use crate::value::{FromValue, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use tracing::{debug, trace};

/// A node of the configuration tree.
#[derive(Debug, Clone)]
pub struct ConfigNode {
    name: String,
    description: Option<String>,
    properties: Vec<Property>,
    children: Vec<ConfigNode>,
}

/// Anything the node builder accepts as a property declaration.
pub trait IntoPropertyDef {
    /// # Errors
    /// Propagates the declaration error of an unfinished builder.
    fn into_property_def(self) -> Result<PropertyDef, ConfigError>;
}

impl IntoPropertyDef for PropertyDef {
    fn into_property_def(self) -> Result<PropertyDef, ConfigError> {
        Ok(self)
    }
}

impl IntoPropertyDef for PropertyDefBuilder<WithDefault> {
    fn into_property_def(self) -> Result<PropertyDef, ConfigError> {
        self.build()
    }
}

#[derive(Debug)]
pub struct ConfigNodeBuilder {
    name: String,
    description: Option<String>,
    properties: Vec<Result<PropertyDef, ConfigError>>,
    children: Vec<ConfigNodeBuilder>,
}

impl ConfigNodeBuilder {
    #[must_use = "The builder must be finished with build()."]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares a property; declaration errors surface from [`Self::build`].
    #[must_use = "The builder must be finished with build()."]
    pub fn property(mut self, def: impl IntoPropertyDef) -> Self {
        self.properties.push(def.into_property_def());
        self
    }

    #[must_use = "The builder must be finished with build()."]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Finishes the tree and checks its naming invariants.
    ///
    /// # Errors
    /// Returns the first property declaration error, or [`ConfigError::Construction`] when a
    /// property name repeats anywhere in the tree or two siblings share a name.
    pub fn build(self) -> Result<ConfigNode, ConfigError> {
        let node = self.assemble()?;

        let mut seen = HashSet::new();
        for property in node.walk() {
            if !seen.insert(property.name()) {
                return Err(ConfigError::construction(format!(
                    "property '{}' is declared more than once in tree '{}'",
                    property.name(),
                    node.name
                )));
            }
        }

        debug!(node = %node.name, properties = seen.len(), "config tree built");
        Ok(node)
    }

    fn assemble(self) -> Result<ConfigNode, ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::construction("config node names must not be empty"));
        }

        let properties = self
            .properties
            .into_iter()
            .map(|def| def.map(Property::new))
            .collect::<Result<Vec<_>, _>>()?;

        let mut children: Vec<ConfigNode> = Vec::with_capacity(self.children.len());
        for child in self.children {
            let child = child.assemble()?;
            if children.iter().any(|c| c.name == child.name) {
                return Err(ConfigError::construction(format!(
                    "node '{}' has two children named '{}'",
                    self.name, child.name
                )));
            }
            children.push(child);
        }

        Ok(ConfigNode { name: self.name, description: self.description, properties, children })
    }
}

impl ConfigNode {
    pub fn builder(name: impl Into<String>) -> ConfigNodeBuilder {
        ConfigNodeBuilder {
            name: name.into(),
            description: None,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Self> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.iter()
    }

    /// `true` when a property of this name exists in the subtree.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Property names of the subtree in depth-first declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.walk().into_iter().map(Property::name).collect()
    }

    /// Property definitions of the subtree in depth-first declaration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<&PropertyDef> {
        self.walk().into_iter().map(Property::def).collect()
    }

    /// Resolved value of `name`. Computed properties see this node as their root.
    ///
    /// # Errors
    /// [`ConfigError::UnknownProperty`], a validation error of the resolved value, a
    /// [`ConfigError::CyclicDependency`], or whatever a computed provider returns.
    pub fn get(&self, name: &str) -> Result<Value, ConfigError> {
        Resolver::new(self).get(name)
    }

    /// Typed read, e.g. `node.get_as::<Option<Vec<String>>>("allowed_branches")`.
    ///
    /// # Errors
    /// Same as [`Self::get`], plus a validation error when the value has another shape.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T, ConfigError> {
        T::from_value(name, self.get(name)?)
    }

    /// Checks `value` against the constraint of `name` without writing it.
    ///
    /// # Errors
    /// [`ConfigError::UnknownProperty`] or [`ConfigError::Validation`].
    pub fn validate(&self, name: &str, value: &Value) -> Result<(), ConfigError> {
        self.find(name).ok_or_else(|| ConfigError::unknown(name))?.def().validate(value)
    }

    /// Writes a literal value or a computed function.
    ///
    /// Literal values are validated before they are stored. A computed function is stored, then
    /// evaluated once against this node; if that evaluation fails, the previous setting is put
    /// back and the error returned.
    ///
    /// # Errors
    /// [`ConfigError::UnknownProperty`], [`ConfigError::Validation`] or the trial evaluation error.
    pub fn set(&mut self, name: &str, setting: impl Into<Setting>) -> Result<(), ConfigError> {
        let setting = setting.into();
        let property = self.find_mut(name).ok_or_else(|| ConfigError::unknown(name))?;

        match setting {
            Setting::Value(value) => {
                property.def().validate(&value)?;
                trace!(property = name, %value, "property set");
                property.write(Setting::Value(value));
            },
            computed @ Setting::Computed(_) => {
                let previous = property.write(computed);
                if let Err(err) = self.get(name) {
                    if let Some(property) = self.find_mut(name) {
                        property.restore(previous);
                    }
                    return Err(err);
                }
                trace!(property = name, "computed property set");
            },
        }
        Ok(())
    }

    /// Applies every entry of `values` or none of them.
    ///
    /// All keys are checked first; the values are then written to a staged copy, which replaces
    /// this node only when every write succeeded.
    ///
    /// # Errors
    /// [`ConfigError::UnknownProperty`] for the first unknown key, or the first validation error.
    pub fn update(&mut self, values: &FlatDict) -> Result<(), ConfigError> {
        if let Some(unknown) = values.keys().find(|key| !self.contains(key)) {
            return Err(ConfigError::unknown(unknown));
        }

        let mut staged = self.clone();
        for (name, value) in values.iter() {
            staged.set(name, value.clone())?;
        }
        *self = staged;

        debug!(node = %self.name, updated = values.len(), "config updated");
        Ok(())
    }

    /// Every property of the subtree back to its default provider.
    pub fn reset(&mut self) {
        for property in &mut self.properties {
            property.reset();
        }
        for child in &mut self.children {
            child.reset();
        }
    }

    /// Deep copy: literal values are cloned, computed functions are shared.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Flat view of the resolved subtree: one entry per property in depth-first declaration order.
    ///
    /// # Errors
    /// The first resolution error, or [`ConfigError::Construction`] on a key collision.
    pub fn get_dict(&self) -> Result<FlatDict, ConfigError> {
        let resolver = Resolver::new(self);
        let mut flat = FlatDict::new();
        for property in self.walk() {
            let value = resolver.resolve(property)?;
            if flat.insert(property.name(), value).is_some() {
                return Err(ConfigError::construction(format!(
                    "key '{}' appears twice while flattening '{}'",
                    property.name(),
                    self.name
                )));
            }
        }
        Ok(flat)
    }

    /// `true` when `name` still holds its default provider.
    ///
    /// # Errors
    /// [`ConfigError::UnknownProperty`].
    pub fn is_default(&self, name: &str) -> Result<bool, ConfigError> {
        self.find(name).map(Property::is_default).ok_or_else(|| ConfigError::unknown(name))
    }

    fn walk(&self) -> Vec<&Property> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Property>) {
        out.extend(self.properties.iter());
        for child in &self.children {
            child.collect_into(out);
        }
    }

    fn find(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name() == name)
            .or_else(|| self.children.iter().find_map(|c| c.find(name)))
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Property> {
        if let Some(index) = self.properties.iter().position(|p| p.name() == name) {
            return self.properties.get_mut(index);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }
}

/// Read access to the tree handed to computed providers.
///
/// Tracks the chain of properties being resolved, so a computed property that reads itself
/// (directly or through others) fails with [`ConfigError::CyclicDependency`].
#[derive(Debug)]
pub struct Resolver<'a> {
    root: &'a ConfigNode,
    resolving: RefCell<Vec<String>>,
}

impl<'a> Resolver<'a> {
    fn new(root: &'a ConfigNode) -> Self {
        Self { root, resolving: RefCell::new(Vec::new()) }
    }

    /// The node the current read was issued on.
    #[must_use]
    pub const fn node(&self) -> &'a ConfigNode {
        self.root
    }

    /// # Errors
    /// Same as [`ConfigNode::get`].
    pub fn get(&self, name: &str) -> Result<Value, ConfigError> {
        let property = self.root.find(name).ok_or_else(|| ConfigError::unknown(name))?;
        self.resolve(property)
    }

    /// # Errors
    /// Same as [`ConfigNode::get_as`].
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T, ConfigError> {
        T::from_value(name, self.get(name)?)
    }

    fn resolve(&self, property: &Property) -> Result<Value, ConfigError> {
        let name = property.name();
        {
            let mut resolving = self.resolving.borrow_mut();
            if let Some(start) = resolving.iter().position(|n| n == name) {
                let mut chain = resolving[start..].to_vec();
                chain.push(name.to_owned());
                return Err(ConfigError::CyclicDependency { chain, context: None });
            }
            resolving.push(name.to_owned());
        }

        let result = property.read(self);
        self.resolving.borrow_mut().pop();
        result
    }
}

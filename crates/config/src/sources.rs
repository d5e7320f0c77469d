//! # Config sources
//!
//! Layered overrides for a [`ConfigNode`], read with the `config` crate:
//!
//! 1. **File**: `.toml`, `.json`, `.yaml`, ... (format from the extension). Keys are property names;
//!    tables whose name is not a property are read as plain sections, so
//!    `[quality] reformat = false` and `reformat = false` are equivalent.
//! 2. **Environment**: `PREFIX__NAME=value`, e.g. `DTK__INT_ARG=5`. Names are matched
//!    case-insensitively.
//!
//! String values are coerced with the same rules as command-line tokens, so
//! `DTK__LIST_ARG="[1, 2]"` yields a list. The result is applied through
//! [`ConfigNode::update`]: an unknown key fails the whole load and nothing is written.

use crate::constraint::Constraint;
use crate::error::{ConfigError, ConfigErrorExt};
use crate::flat::FlatDict;
use crate::node::ConfigNode;
use crate::property::PropertyDef;
use crate::value::Value;
use config::{Config, Environment, File};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment separator between the prefix and the property name.
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Default, Clone)]
pub struct ConfigSources {
    file: Option<(PathBuf, bool)>,
    env_prefix: Option<String>,
    env_vars: Option<config::Map<String, String>>,
}

impl ConfigSources {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A file that must exist.
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some((path.into(), true));
        self
    }

    /// A file that is skipped when missing.
    #[must_use]
    pub fn optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some((path.into(), false));
        self
    }

    /// Reads `PREFIX__NAME` variables.
    #[must_use]
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Replaces the process environment with `vars` for the environment layer.
    #[must_use]
    pub fn env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Reads the layers and maps their keys onto the properties of `node`.
    ///
    /// # Errors
    /// [`ConfigError::Source`] for unreadable files, [`ConfigError::UnknownProperty`] for keys
    /// that match no property, and coercion errors for unusable string values.
    pub fn load(&self, node: &ConfigNode) -> Result<FlatDict, ConfigError> {
        let mut builder = Config::builder();
        if let Some((path, required)) = &self.file {
            info!(path = %path.display(), "loading config file");
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .source(self.env_vars.clone()),
            );
        }

        let raw = builder
            .build()
            .context("Failed to read config sources")?
            .try_deserialize::<BTreeMap<String, Value>>()
            .context("Failed to deserialize config sources")?;

        let mut flat = FlatDict::new();
        collect(node, raw, &mut flat)?;
        debug!(keys = flat.len(), "config sources loaded");
        Ok(flat)
    }
}

fn collect(
    node: &ConfigNode,
    raw: BTreeMap<String, Value>,
    flat: &mut FlatDict,
) -> Result<(), ConfigError> {
    for (key, value) in raw {
        match lookup(node, &key) {
            Some(def) => {
                let value = coerce_loaded(def.name(), def.constraint(), value)?;
                flat.insert(def.name(), value);
            },
            None => match value {
                Value::Dict(section) => collect(node, section, flat)?,
                _ => return Err(ConfigError::unknown(&key)),
            },
        }
    }
    Ok(())
}

fn lookup<'a>(node: &'a ConfigNode, key: &str) -> Option<&'a PropertyDef> {
    let definitions = node.definitions();
    definitions
        .iter()
        .find(|d| d.name() == key)
        .or_else(|| definitions.iter().find(|d| d.name().eq_ignore_ascii_case(key)))
        .copied()
}

/// Files carry typed values, the environment only strings.
fn coerce_loaded(name: &str, constraint: &Constraint, value: Value) -> Result<Value, ConfigError> {
    if constraint.accepts(&value) {
        return Ok(value);
    }
    match value {
        Value::Str(token) => constraint.coerce(name, &token),
        #[allow(clippy::cast_precision_loss)]
        Value::Int(i) if constraint.accepts(&Value::Float(i as f64)) => Ok(Value::Float(i as f64)),
        other => Ok(other),
    }
}

impl ConfigNode {
    /// Loads `sources` and applies them atomically.
    ///
    /// # Errors
    /// See [`ConfigSources::load`] and [`ConfigNode::update`].
    pub fn apply_sources(&mut self, sources: &ConfigSources) -> Result<(), ConfigError> {
        let values = sources.load(self)?;
        self.update(&values)
    }
}

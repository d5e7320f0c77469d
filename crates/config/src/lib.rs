//! # Config
//!
//! Declarative, typed configuration trees with command-line binding.
//!
//! * [`PropertyDef`]: a named setting with a [`Constraint`], a description and a default provider
//!   (lazy constant or computed from other properties).
//! * [`ConfigNode`]: a tree of properties with flat export ([`ConfigNode::get_dict`]), atomic
//!   [`ConfigNode::update`], [`ConfigNode::reset`] and [`ConfigNode::copy`].
//! * CLI: [`ConfigNode::with_cli`] turns every property into a `--<name> <VALUE>` flag.
//! * [`ConfigSources`]: file and environment layers applied below the command line.
//!
//! ## Example
//!
//! ```rust
//! use dtk_config::{ConfigNode, Constraint, Kind, PropertyDef, Value};
//!
//! let mut config = ConfigNode::builder("demo")
//!     .property(
//!         PropertyDef::builder("retries", Constraint::Type(Kind::Int))
//!             .description("How often to retry.")
//!             .default_value(3),
//!     )
//!     .property(
//!         PropertyDef::builder("label", Constraint::Type(Kind::Str))
//!             .computed(|r| Ok(format!("{} retries", r.get_as::<i64>("retries")?).into())),
//!     )
//!     .build()?;
//!
//! config.try_with_cli_from(None, ["demo", "--retries", "5"])?;
//! assert_eq!(config.get("label")?, Value::from("5 retries"));
//! # Ok::<(), dtk_config::ConfigError>(())
//! ```

mod cli;
mod constraint;
mod error;
mod flat;
mod literal;
mod node;
mod property;
mod sources;
mod value;

pub use crate::constraint::Constraint;
pub use crate::error::{ConfigError, ConfigErrorExt};
pub use crate::flat::FlatDict;
pub use crate::literal::parse_literal;
pub use crate::node::{ConfigNode, ConfigNodeBuilder, IntoPropertyDef, Resolver};
pub use crate::property::{
    Computed, NoDefault, PropertyDef, PropertyDefBuilder, Setting, WithDefault,
};
pub use crate::sources::ConfigSources;
pub use crate::value::{FromValue, Kind, Value};

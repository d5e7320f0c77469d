//! # Config Errors
//!
//! [`ConfigError`] covers the three families of configuration failures:
//! validation (a value breaks its property's constraint), lookup (a name that is not in the
//! tree) and construction (a tree or property that is declared incorrectly). Plus the I/O and
//! parsing failures of the file/environment layers and the command line.

use std::borrow::Cow;

#[dtk_derive::dtk_error]
pub enum ConfigError {
    /// A value does not satisfy the declared constraint of a property.
    #[error("Invalid value for '{property}'{}: {message}", format_context(.context))]
    Validation { property: String, message: String, context: Option<Cow<'static, str>> },

    /// A property name that does not exist anywhere in the tree.
    #[error("Unknown property '{name}'{}", format_context(.context))]
    UnknownProperty { name: String, context: Option<Cow<'static, str>> },

    /// The tree or one of its properties is declared incorrectly.
    #[error("Invalid config declaration{}: {message}", format_context(.context))]
    Construction { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Computed properties that (transitively) read themselves.
    #[error("Cyclic dependency between computed properties{}: {}", format_context(.context), format_chain(.chain))]
    CyclicDependency { chain: Vec<String>, context: Option<Cow<'static, str>> },

    /// A structured literal (`[1, 2]`, `{'a': 1}`, ...) could not be parsed.
    #[error("Malformed literal{}: {message} at offset {offset} in `{input}`", format_context(.context))]
    Literal { input: String, offset: usize, message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Failure while reading file or environment layers.
    #[error("Config source error{}: {source}", format_context(.context))]
    Source { source: config::ConfigError, context: Option<Cow<'static, str>> },

    /// Failure while converting a flat dictionary into a typed structure.
    #[error("Config conversion error{}: {source}", format_context(.context))]
    Conversion { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// Command-line parsing failed; the clap error carries the usage message and exit code.
    #[error("{source}")]
    Cli { source: clap::Error, context: Option<Cow<'static, str>> },

    #[error("Internal config error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn format_chain(chain: &[String]) -> String {
    chain.join(" -> ")
}

impl ConfigError {
    pub(crate) fn validation(property: &str, message: impl Into<String>) -> Self {
        Self::Validation { property: property.to_owned(), message: message.into(), context: None }
    }

    pub(crate) fn unknown(name: &str) -> Self {
        Self::UnknownProperty { name: name.to_owned(), context: None }
    }

    pub(crate) fn construction(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Construction { message: message.into(), context: None }
    }

    /// Process exit code for this error: clap's own code for CLI errors, `1` otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cli { source, .. } => source.exit_code(),
            _ => 1,
        }
    }
}

//! # CLI binding
//!
//! Every property of a tree becomes a `--<name> <VALUE>` flag. Values may start with `-`, so
//! `--int_arg -5` and `--str_arg -k` work. The flag's help text is the
//! property description, the value placeholder is derived from the constraint, and the token is
//! coerced by [`Constraint::coerce`] inside clap's value parser, so bad tokens are reported as
//! ordinary clap usage errors. Parsed values are applied through [`ConfigNode::update`], which
//! keeps a failed invocation from touching the tree.

use crate::constraint::Constraint;
use crate::error::ConfigError;
use crate::flat::FlatDict;
use crate::node::ConfigNode;
use crate::value::Value;
use clap::builder::ValueParser;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use tracing::debug;

/// Flag name clap owns. No `--version` flag is generated, so `version` is a usable name.
const RESERVED: &str = "help";

impl ConfigNode {
    /// Builds the clap command for this tree.
    ///
    /// `about` is the top-level description; without it the node description is used.
    ///
    /// # Errors
    /// Returns [`ConfigError::Construction`] when a property is named `help`.
    pub fn command(&self, about: Option<&str>) -> Result<Command, ConfigError> {
        let mut command = Command::new(self.name().to_owned());
        if let Some(about) = about.or_else(|| self.description()) {
            command = command.about(about.to_owned());
        }

        for def in self.definitions() {
            let name = def.name();
            if name == RESERVED {
                return Err(ConfigError::construction(format!(
                    "property name '{name}' is reserved by the command line"
                )));
            }

            let mut arg = Arg::new(name.to_owned())
                .long(name.to_owned())
                .value_name(def.constraint().placeholder())
                .num_args(1)
                .allow_hyphen_values(true)
                .action(ArgAction::Set)
                .value_parser(token_parser(name, def.constraint()));
            if let Some(help) = def.description() {
                arg = arg.help(help.to_owned());
            }
            command = command.arg(arg);
        }

        Ok(command)
    }

    /// Parses `args` (program name first) and applies the given flags.
    ///
    /// # Errors
    /// Returns [`ConfigError::Cli`] for usage errors and help requests (see
    /// [`ConfigError::exit_code`]) and any error of [`ConfigNode::update`].
    pub fn try_with_cli_from<I, T>(
        &mut self,
        about: Option<&str>,
        args: I,
    ) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command(about)?.try_get_matches_from(args)?;
        let values = self.collect_matches(&matches)?;
        debug!(flags = values.len(), "command line parsed");
        self.update(&values)
    }

    /// Parses the process arguments and applies them. On error the message is printed and the
    /// process exits: with status `0` for `--help`, non-zero otherwise.
    #[allow(clippy::print_stderr)]
    pub fn with_cli(&mut self, about: Option<&str>) -> &mut Self {
        match self.try_with_cli_from(about, std::env::args_os()) {
            Ok(()) => self,
            Err(ConfigError::Cli { source, .. }) => source.exit(),
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(err.exit_code());
            },
        }
    }

    fn collect_matches(&self, matches: &ArgMatches) -> Result<FlatDict, ConfigError> {
        let mut values = FlatDict::new();
        for name in self.names() {
            let value = matches.try_get_one::<Value>(name).map_err(|e| {
                ConfigError::from(format!("command line value of '{name}' has an unexpected type: {e}"))
            })?;
            if let Some(value) = value {
                values.insert(name, value.clone());
            }
        }
        Ok(values)
    }
}

fn token_parser(name: &str, constraint: &Constraint) -> ValueParser {
    let name = name.to_owned();
    let constraint = constraint.clone();
    ValueParser::new(move |token: &str| {
        constraint.coerce(&name, token).map_err(|err| match err {
            ConfigError::Validation { message, .. } => message,
            other => other.to_string(),
        })
    })
}

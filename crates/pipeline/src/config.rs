//! # Pipeline configuration
//!
//! The pipeline's settings as a [`ConfigNode`] tree, so they can be overridden from a file, the
//! environment and the command line, plus the typed [`PipelineSettings`] view the runner consumes.

use crate::error::PipelineError;
use dtk_config::{ConfigError, ConfigNode, Constraint, Kind, PropertyDef, Value};
use serde::Deserialize;
use tracing::trace;

pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Builds the pipeline configuration tree with its defaults.
///
/// # Errors
/// Only fails on a declaration error, which would be a bug in this function.
pub fn pipeline_config() -> Result<ConfigNode, ConfigError> {
    ConfigNode::builder("dtk-cicd")
        .description("Run tests, reformat, bump the version, regenerate docs and push to git.")
        .property(
            PropertyDef::builder("log_level", Constraint::one_of(LOG_LEVELS))
                .description("Verbosity of the pipeline log.")
                .default_value("info"),
        )
        .property(
            PropertyDef::builder("dry_run", Constraint::Type(Kind::Bool))
                .description("Log the commands instead of running them. Files are not changed.")
                .default_value(false),
        )
        .property(
            PropertyDef::builder("print_config", Constraint::Type(Kind::Bool))
                .description("Print the resolved configuration as JSON and exit.")
                .default_value(false),
        )
        .property(
            PropertyDef::builder("project_root", Constraint::optional(Kind::Str))
                .description("Project root. Discovered from the working directory when None.")
                .default_value(Value::Null),
        )
        .child(quality())
        .child(release())
        .child(git())
        .build()
}

fn quality() -> dtk_config::ConfigNodeBuilder {
    ConfigNode::builder("quality")
        .property(
            PropertyDef::builder("reformat", Constraint::Type(Kind::Bool))
                .description("Reformat all python files with black. Configure it in pyproject.toml.")
                .default_value(true),
        )
        .property(
            PropertyDef::builder("test", Constraint::Type(Kind::Bool))
                .description("Run pytest tests.")
                .default_value(true),
        )
        .property(
            PropertyDef::builder("test_options", Constraint::optional(Kind::Dict))
                .description(
                    "Options of the test run, e.g. {'verbose': 0, 'coverage': True, \
                     'stop_on_first_error': False, 'extra_args': ['-k', 'fast']}.",
                )
                .default_value(Value::Null),
        )
}

fn release() -> dtk_config::ConfigNodeBuilder {
    ConfigNode::builder("release")
        .property(
            PropertyDef::builder("version", Constraint::Type(Kind::Str))
                .description(
                    "New version like '1.2.3'. 'increment' bumps the patch number, \
                     an empty string or 'None' keeps the version.",
                )
                .default_value("increment"),
        )
        .property(
            PropertyDef::builder("generate_readme", Constraint::Type(Kind::Bool))
                .description("Write the module docstring of __init__.py to README.md and stage it.")
                .default_value(false),
        )
        .property(
            PropertyDef::builder("sphinx_docs", Constraint::Type(Kind::Bool))
                .description("Regenerate the sphinx-apidoc rst files in docs/source.")
                .default_value(true),
        )
}

fn git() -> dtk_config::ConfigNodeBuilder {
    ConfigNode::builder("git")
        .property(
            PropertyDef::builder("commit_and_push_git", Constraint::Type(Kind::Bool))
                .description("Stage everything, commit and push.")
                .default_value(true),
        )
        .property(
            PropertyDef::builder("commit_message", Constraint::Type(Kind::Str))
                .description("Commit message. Defaults to 'Release <version>' for explicit versions.")
                .computed(|config| {
                    let version = config.get_as::<String>("version")?;
                    let explicit = version.trim();
                    let message = match explicit {
                        "" | "None" | "none" | "increment" => "New commit".to_owned(),
                        _ => format!("Release {explicit}"),
                    };
                    Ok(message.into())
                }),
        )
        .property(
            PropertyDef::builder("allowed_branches", Constraint::optional(Kind::List))
                .description("Run only on these branches. None allows every branch.")
                .default_value(vec!["master", "main"]),
        )
}

/// Options of the pytest run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestOptions {
    /// `0`: `-q --tb=no`, `1`: `--tb=short`, `2`: pytest defaults.
    pub verbose: u8,
    /// Adds `--cov <app> --cov-report xml:.coverage.xml` (needs pytest-cov).
    pub coverage: bool,
    /// Adds `-x`.
    pub stop_on_first_error: bool,
    pub extra_args: Vec<String>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self { verbose: 1, coverage: false, stop_on_first_error: true, extra_args: Vec::new() }
    }
}

/// Typed view of the resolved pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineSettings {
    pub log_level: String,
    pub dry_run: bool,
    pub print_config: bool,
    pub project_root: Option<String>,
    pub reformat: bool,
    pub test: bool,
    #[serde(default)]
    pub test_options: Option<TestOptions>,
    pub version: String,
    pub generate_readme: bool,
    pub sphinx_docs: bool,
    pub commit_and_push_git: bool,
    pub commit_message: String,
    pub allowed_branches: Option<Vec<String>>,
}

impl PipelineSettings {
    /// Resolves `config` and converts it.
    ///
    /// # Errors
    /// A resolution error, or a conversion error for malformed `test_options`.
    pub fn from_config(config: &ConfigNode) -> Result<Self, PipelineError> {
        let flat = config.get_dict()?;
        trace!(?flat, "resolved pipeline configuration");
        Ok(flat.deserialize_into()?)
    }

    /// Test options, falling back to the defaults when unset.
    #[must_use]
    pub fn test_options(&self) -> TestOptions {
        self.test_options.clone().unwrap_or_default()
    }
}

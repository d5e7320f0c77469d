use std::borrow::Cow;
use std::path::PathBuf;

/// Errors raised while preparing or running the release pipeline.
#[dtk_derive::dtk_error]
pub enum PipelineError {
    #[error("Pipeline configuration error{}: {source}", format_context(.context))]
    Config { source: dtk_config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    /// Walking the project tree failed.
    #[error("Project scan error{}: {source}", format_context(.context))]
    Walk { source: walkdir::Error, context: Option<Cow<'static, str>> },

    /// No directory up from `start` holds `.git`, `pyproject.toml` or `setup.py`.
    #[error("No project root found above '{}'{}", .start.display(), format_context(.context))]
    ProjectNotFound { start: PathBuf, context: Option<Cow<'static, str>> },

    /// A path the pipeline needs (package, `__init__.py`, docs) could not be determined.
    #[error("Missing project path '{what}'{}: {message}", format_context(.context))]
    MissingPath { what: &'static str, message: String, context: Option<Cow<'static, str>> },

    /// The version request or the `__version__` line is malformed.
    #[error("Version error{}: {message}", format_context(.context))]
    Version { message: String, context: Option<Cow<'static, str>> },

    /// An external command could not be started or exited unsuccessfully.
    #[error("Command `{command}` failed{}: {message}", format_context(.context))]
    Command { command: String, message: String, context: Option<Cow<'static, str>> },

    #[error("Pipeline started on branch '{branch}', allowed branches are {allowed:?}{}", format_context(.context))]
    BranchNotAllowed { branch: String, allowed: Vec<String>, context: Option<Cow<'static, str>> },

    #[error("Internal pipeline error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl PipelineError {
    pub(crate) fn version(message: impl Into<String>) -> Self {
        Self::Version { message: message.into(), context: None }
    }

    pub(crate) fn command(command: impl ToString, message: impl Into<String>) -> Self {
        Self::Command { command: command.to_string(), message: message.into(), context: None }
    }
}

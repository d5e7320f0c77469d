//! External commands and the runners that execute them.
//!
//! Pipeline steps only assemble [`CommandLine`]s; a [`CommandRunner`] decides what happens to
//! them. [`SystemRunner`] spawns processes, [`DryRunRunner`] records and logs them.

use crate::error::PipelineError;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// A program, its arguments and the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), cwd: cwd.into() }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}

/// Shell-like rendering, arguments with spaces are quoted.
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg.replace('"', "\\\""))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes command lines for the pipeline.
pub trait CommandRunner: Send + Sync {
    /// Runs `command` to completion.
    ///
    /// # Errors
    /// [`PipelineError::Command`] when the program cannot start or exits unsuccessfully.
    fn run(&self, command: &CommandLine) -> Result<CommandOutput, PipelineError>;

    /// `true` when commands are only recorded; steps with local side effects skip those too.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Spawns real processes and captures their output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput, PipelineError> {
        info!(command = %command, cwd = %command.cwd.display(), "running command");

        let output = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .output()
            .map_err(|e| PipelineError::command(command, format!("could not start: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
            return Err(PipelineError::command(command, format!("{}: {detail}", output.status)));
        }

        debug!(command = %command, "command finished");
        Ok(CommandOutput { stdout, stderr })
    }
}

/// Records command lines instead of running them.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    recorded: Mutex<Vec<CommandLine>>,
}

impl DryRunRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything "run" so far, in order.
    #[must_use]
    pub fn recorded(&self) -> Vec<CommandLine> {
        self.recorded.lock().clone()
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput, PipelineError> {
        info!(command = %command, cwd = %command.cwd.display(), "dry run, not executed");
        self.recorded.lock().push(command.clone());
        Ok(CommandOutput::default())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

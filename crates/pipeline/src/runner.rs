//! # Pipeline runner
//!
//! Runs the release steps in a fixed order and reports what happened to each of them.
//! A version bump that was already written is rolled back when a later step (readme, docs, git)
//! fails.

use crate::command::CommandRunner;
use crate::config::PipelineSettings;
use crate::error::PipelineError;
use crate::paths::ProjectPaths;
use crate::steps;
use crate::version::{self, VersionRequest};
use std::fmt;
use std::time::{Duration, Instant};
use strum_macros::{AsRefStr, Display, EnumIter};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Step {
    Branch,
    Tests,
    Reformat,
    Version,
    Readme,
    Docs,
    Git,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Skipped(&'static str),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => f.write_str("done"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

/// Result of a pipeline run, one entry per step in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub steps: Vec<StepReport>,
    /// `(previous, current)` when the version step ran.
    pub version: Option<(String, String)>,
}

impl Report {
    #[must_use]
    pub fn outcome(&self, step: Step) -> Option<&Outcome> {
        self.steps.iter().find(|r| r.step == step).map(|r| &r.outcome)
    }

    fn skip(&mut self, step: Step, reason: &'static str) {
        info!(step = %step, reason, "step skipped");
        self.steps.push(StepReport { step, outcome: Outcome::Skipped(reason), elapsed: Duration::ZERO });
    }

    fn timed<T>(
        &mut self,
        step: Step,
        f: impl FnOnce() -> Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        info!(step = %step, "step started");
        let started = Instant::now();
        let value = f()?;
        let elapsed = started.elapsed();
        info!(step = %step, ?elapsed, "step finished");
        self.steps.push(StepReport { step, outcome: Outcome::Done, elapsed });
        Ok(value)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<15} {:<40} {:>10}", "Step", "Outcome", "Elapsed")?;
        writeln!(f, "{:-<80}", "")?;
        for entry in &self.steps {
            let elapsed = format!("{:.2}s", entry.elapsed.as_secs_f64());
            writeln!(f, "{:<15} {:<40} {:>10}", entry.step.as_ref(), entry.outcome.to_string(), elapsed)?;
        }
        if let Some((previous, current)) = &self.version {
            writeln!(f, "\nVersion: {previous} -> {current}")?;
        }
        Ok(())
    }
}

/// One configured pipeline run.
pub struct Pipeline<'a> {
    settings: &'a PipelineSettings,
    paths: &'a ProjectPaths,
    runner: &'a dyn CommandRunner,
}

impl fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", self.settings)
            .field("paths", self.paths)
            .field("dry_run", &self.runner.is_dry_run())
            .finish()
    }
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(
        settings: &'a PipelineSettings,
        paths: &'a ProjectPaths,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self { settings, paths, runner }
    }

    /// Runs every enabled step.
    ///
    /// # Errors
    /// The first failing step's error. The version file is restored when it was bumped before
    /// the readme, docs or git step failed.
    #[instrument(skip(self), fields(root = %self.paths.root().display(), dry_run = self.runner.is_dry_run()))]
    pub fn run(&self) -> Result<Report, PipelineError> {
        let settings = self.settings;
        let (runner, paths) = (self.runner, self.paths);
        let dry_run = runner.is_dry_run();
        let request: VersionRequest = settings.version.parse()?;
        let mut report = Report::default();

        match &settings.allowed_branches {
            _ if dry_run => report.skip(Step::Branch, "dry run"),
            Some(allowed) => {
                report.timed(Step::Branch, || steps::check_branch(runner, paths, allowed))?;
            }
            None => report.skip(Step::Branch, "every branch allowed"),
        }

        if settings.test {
            let options = settings.test_options();
            report.timed(Step::Tests, || steps::run_tests(runner, paths, &options))?;
        } else {
            report.skip(Step::Tests, "disabled");
        }

        if settings.reformat {
            report.timed(Step::Reformat, || steps::reformat(runner, paths))?;
        } else {
            report.skip(Step::Reformat, "disabled");
        }

        let bumped = if request == VersionRequest::Keep {
            report.skip(Step::Version, "kept");
            None
        } else if dry_run {
            let init = paths.init()?;
            let current = version::read_version(init)?;
            let next = version::plan(&current, request)?;
            info!(from = %current, to = %next, "dry run, version file not changed");
            report.version = Some((current, next));
            report.skip(Step::Version, "dry run");
            None
        } else {
            let init = paths.init()?;
            let (previous, current) =
                report.timed(Step::Version, || version::apply_request(init, request))?;
            report.version = Some((previous.clone(), current));
            Some(previous)
        };

        let published = self.publish(&mut report);
        if let (Err(_), Some(previous)) = (&published, bumped) {
            let init = paths.init()?;
            warn!(version = %previous, "restoring the version after a failed step");
            if let Err(e) = version::write_version(init, &previous) {
                warn!(error = %e, "version could not be restored");
            }
            report.version = None;
        }
        published?;

        Ok(report)
    }

    fn publish(&self, report: &mut Report) -> Result<(), PipelineError> {
        let (runner, paths) = (self.runner, self.paths);

        if self.settings.generate_readme {
            report.timed(Step::Readme, || steps::generate_readme(runner, paths))?;
        } else {
            report.skip(Step::Readme, "disabled");
        }

        if self.settings.sphinx_docs {
            report.timed(Step::Docs, || steps::regenerate_docs(runner, paths))?;
        } else {
            report.skip(Step::Docs, "disabled");
        }

        if self.settings.commit_and_push_git {
            let message = &self.settings.commit_message;
            report.timed(Step::Git, || steps::commit_and_push(runner, paths, message))?;
        } else {
            report.skip(Step::Git, "disabled");
        }
        Ok(())
    }
}

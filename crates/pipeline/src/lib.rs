//! # Pipeline
//!
//! A release pipeline for Python projects driven by a [`dtk_config`] tree:
//! tests (`pytest`), reformatting (`black`), a `__version__` bump, API docs (`sphinx-apidoc`)
//! and a git commit and push.
//!
//! Steps only assemble [`CommandLine`]s. The [`CommandRunner`] given to the [`Pipeline`] decides
//! whether they are spawned ([`SystemRunner`]) or recorded ([`DryRunRunner`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use dtk_pipeline::{DryRunRunner, Pipeline, PipelineSettings, ProjectPaths, pipeline_config};
//!
//! let config = pipeline_config()?;
//! let settings = PipelineSettings::from_config(&config)?;
//! let paths = ProjectPaths::discover(".")?;
//! let runner = DryRunRunner::new();
//!
//! let report = Pipeline::new(&settings, &paths, &runner).run()?;
//! println!("{report}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod command;
mod config;
mod error;
mod paths;
mod runner;
pub mod steps;
pub mod version;

pub use crate::command::{CommandLine, CommandOutput, CommandRunner, DryRunRunner, SystemRunner};
pub use crate::config::{LOG_LEVELS, PipelineSettings, TestOptions, pipeline_config};
pub use crate::error::{PipelineError, PipelineErrorExt};
pub use crate::paths::ProjectPaths;
pub use crate::runner::{Outcome, Pipeline, Report, Step, StepReport};
pub use crate::version::{Version, VersionRequest};

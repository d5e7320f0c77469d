//! # Project paths
//!
//! The directories the pipeline works on, discovered once and passed explicitly to every step.
//! Nothing changes the process working directory; commands get their `cwd` from here.

use crate::error::PipelineError;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Files whose presence marks a project root.
const ROOT_MARKERS: [&str; 3] = [".git", "pyproject.toml", "setup.py"];
/// Directories never searched for the application package.
const EXCLUDED_DIRS: [&str; 7] = ["venv", ".venv", "node_modules", "tests", "docs", "build", "dist"];
const PACKAGE_SEARCH_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
    app: Option<PathBuf>,
    init: Option<PathBuf>,
    docs: PathBuf,
    readme: PathBuf,
}

impl ProjectPaths {
    /// Walks up from `start` to the project root and infers the remaining paths.
    ///
    /// # Errors
    /// [`PipelineError::ProjectNotFound`] when no ancestor holds a root marker, or a scan error.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let start = start.as_ref();
        let root = start
            .ancestors()
            .find(|dir| ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
            .ok_or_else(|| PipelineError::ProjectNotFound {
                start: start.to_path_buf(),
                context: None,
            })?;
        Self::from_root(root)
    }

    /// Infers the paths of a project whose root is known.
    ///
    /// # Errors
    /// Returns a scan error when the tree cannot be read.
    pub fn from_root(root: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let root = root.into();
        let app = find_package(&root)?;
        let init = app.as_ref().map(|app| app.join("__init__.py"));
        debug!(root = %root.display(), app = ?app, "project paths discovered");

        Ok(Self {
            docs: root.join("docs"),
            readme: root.join("README.md"),
            app,
            init,
            root,
        })
    }

    #[must_use]
    pub fn with_app(mut self, app: impl Into<PathBuf>) -> Self {
        let app = app.into();
        self.init = Some(app.join("__init__.py"));
        self.app = Some(app);
        self
    }

    #[must_use]
    pub fn with_init(mut self, init: impl Into<PathBuf>) -> Self {
        self.init = Some(init.into());
        self
    }

    #[must_use]
    pub fn with_docs(mut self, docs: impl Into<PathBuf>) -> Self {
        self.docs = docs.into();
        self
    }

    #[must_use]
    pub fn with_readme(mut self, readme: impl Into<PathBuf>) -> Self {
        self.readme = readme.into();
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The application package.
    ///
    /// # Errors
    /// [`PipelineError::MissingPath`] when no package was found.
    pub fn app(&self) -> Result<&Path, PipelineError> {
        self.app.as_deref().ok_or_else(|| missing("app", "no package with __init__.py found"))
    }

    /// The file holding `__version__`.
    ///
    /// # Errors
    /// [`PipelineError::MissingPath`] when no package was found.
    pub fn init(&self) -> Result<&Path, PipelineError> {
        self.init.as_deref().ok_or_else(|| missing("init", "no package with __init__.py found"))
    }

    #[must_use]
    pub fn docs(&self) -> &Path {
        &self.docs
    }

    #[must_use]
    pub fn readme(&self) -> &Path {
        &self.readme
    }
}

fn missing(what: &'static str, message: &str) -> PipelineError {
    PipelineError::MissingPath { what, message: message.to_owned(), context: None }
}

fn is_excluded(name: &str) -> bool {
    name.starts_with('.') || EXCLUDED_DIRS.contains(&name)
}

/// First directory (breadth-first, sorted by name) within two levels of `root` holding
/// `__init__.py`.
fn find_package(root: &Path) -> Result<Option<PathBuf>, PipelineError> {
    if !root.is_dir() {
        return Ok(None);
    }
    let mut candidates = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(PACKAGE_SEARCH_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.file_type().is_dir() && !is_excluded(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = entry?;
        if entry.path().join("__init__.py").is_file() {
            candidates.push((entry.depth(), entry.into_path()));
        }
    }

    candidates.sort_by_key(|(depth, _)| *depth);
    Ok(candidates.into_iter().next().map(|(_, path)| path))
}

//! Command lines of the individual pipeline steps.

use crate::command::{CommandLine, CommandRunner};
use crate::config::TestOptions;
use crate::error::{PipelineError, PipelineErrorExt};
use crate::paths::ProjectPaths;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Entries of `docs/source` that survive regeneration.
const DOCS_KEEP: [&str; 5] = ["conf.py", "index.rst", "_static", "_templates", "content"];
/// Generated files removed after `sphinx-apidoc`.
const DOCS_DELETE: [&str; 1] = ["modules.rst"];

/// `pytest` invocation for `options`.
///
/// # Errors
/// [`PipelineError::MissingPath`] when coverage is requested but no package was found.
pub fn test_command(paths: &ProjectPaths, options: &TestOptions) -> Result<CommandLine, PipelineError> {
    let root = paths.root();
    let mut command = CommandLine::new("pytest", root).arg(root.to_string_lossy());

    if options.coverage {
        command = command
            .arg("--cov")
            .arg(paths.app()?.to_string_lossy())
            .args(["--cov-report", "xml:.coverage.xml"]);
    }
    if options.stop_on_first_error {
        command = command.arg("-x");
    }
    command = match options.verbose {
        0 => command.args(["-q", "--tb=no"]),
        1 => command.arg("--tb=short"),
        _ => command,
    };
    Ok(command.args(options.extra_args.iter().cloned()))
}

/// Runs the test suite.
///
/// # Errors
/// The command error when tests fail.
pub fn run_tests(
    runner: &dyn CommandRunner,
    paths: &ProjectPaths,
    options: &TestOptions,
) -> Result<(), PipelineError> {
    runner.run(&test_command(paths, options)?).context("Tests failed")?;
    Ok(())
}

/// Reformats the project with `black`.
///
/// # Errors
/// The command error when black is missing or fails.
pub fn reformat(runner: &dyn CommandRunner, paths: &ProjectPaths) -> Result<(), PipelineError> {
    let command = CommandLine::new("black", paths.root()).args([".", "--quiet"]);
    runner.run(&command).context("Reformatting with black failed, try `black .` manually")?;
    Ok(())
}

/// Regenerates the `sphinx-apidoc` rst files in `docs/source` and stages them.
///
/// Every entry of `docs/source` outside the keep list is deleted first, so renamed or removed
/// modules do not leave stale pages behind.
///
/// # Errors
/// An I/O error while cleaning, a missing package, or a command error.
pub fn regenerate_docs(
    runner: &dyn CommandRunner,
    paths: &ProjectPaths,
) -> Result<(), PipelineError> {
    let docs = paths.docs();
    let source = docs.join("source");
    let app = paths.app()?;

    if !runner.is_dry_run() {
        clean_dir(&source, |name| !DOCS_KEEP.contains(&name))?;
    }

    let apidoc = CommandLine::new("sphinx-apidoc", docs)
        .args(["--module-first", "--force", "--separate", "-o", "source"])
        .arg(app.to_string_lossy());
    runner.run(&apidoc).context("sphinx-apidoc failed")?;

    if !runner.is_dry_run() {
        clean_dir(&source, |name| DOCS_DELETE.contains(&name))?;
    }

    runner.run(&CommandLine::new("git", paths.root()).args(["add", "docs"]))?;
    Ok(())
}

/// Deletes the entries of `dir` whose file name matches `remove`.
fn clean_dir(dir: &Path, remove: impl Fn(&str) -> bool) -> Result<(), PipelineError> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        if !remove(&name.to_string_lossy()) {
            continue;
        }
        let path = entry.path();
        debug!(path = %path.display(), "removing docs entry");
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Writes the module docstring of the package `__init__.py` to the readme and stages it.
///
/// A missing docstring produces an empty readme.
///
/// # Errors
/// A missing package, an I/O error, or the git error.
pub fn generate_readme(
    runner: &dyn CommandRunner,
    paths: &ProjectPaths,
) -> Result<(), PipelineError> {
    let init = paths.init()?;
    let readme = paths.readme();
    let source = fs::read_to_string(init)
        .with_context(|| format!("Failed to read {}", init.display()))?;
    let docstring = module_docstring(&source).unwrap_or_default();

    if !runner.is_dry_run() {
        fs::write(readme, &docstring)
            .with_context(|| format!("Failed to write {}", readme.display()))?;
        debug!(path = %readme.display(), bytes = docstring.len(), "readme generated");
    }

    runner.run(&CommandLine::new("git", paths.root()).arg("add").arg(readme.to_string_lossy()))?;
    Ok(())
}

/// Docstring of a Python module: the string literal that opens it, after comments and blank
/// lines, with the common indentation removed.
fn module_docstring(source: &str) -> Option<String> {
    let mut rest = source.trim_start_matches('\u{feff}');
    loop {
        rest = rest.trim_start();
        match rest.strip_prefix('#') {
            Some(comment) => rest = comment.split_once('\n').map_or("", |(_, tail)| tail),
            None => break,
        }
    }

    let body = rest.strip_prefix(['r', 'R', 'u', 'U']).unwrap_or(rest);
    let quote = ["\"\"\"", "'''", "\"", "'"].into_iter().find(|q| body.starts_with(q))?;
    let inner = &body[quote.len()..];
    let end = inner.find(quote)?;
    Some(dedent(&inner[..end]))
}

fn dedent(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let indent = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let cleaned: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.trim_start()
            } else {
                line.get(indent..).unwrap_or_else(|| line.trim_start())
            }
        })
        .collect();

    let first = cleaned.iter().position(|l| !l.trim().is_empty()).unwrap_or(cleaned.len());
    let last = cleaned.iter().rposition(|l| !l.trim().is_empty()).map_or(first, |i| i + 1);
    cleaned[first..last].join("\n")
}

/// Name of the checked out branch.
///
/// # Errors
/// The command error when the root is not a git repository.
pub fn current_branch(
    runner: &dyn CommandRunner,
    paths: &ProjectPaths,
) -> Result<String, PipelineError> {
    let output = runner
        .run(&CommandLine::new("git", paths.root()).args(["rev-parse", "--abbrev-ref", "HEAD"]))?;
    Ok(output.stdout.trim().to_owned())
}

/// Fails unless the current branch is one of `allowed`.
///
/// # Errors
/// [`PipelineError::BranchNotAllowed`] or the git error.
pub fn check_branch(
    runner: &dyn CommandRunner,
    paths: &ProjectPaths,
    allowed: &[String],
) -> Result<(), PipelineError> {
    let branch = current_branch(runner, paths)?;
    if allowed.iter().any(|b| *b == branch) {
        info!(%branch, "branch allowed");
        Ok(())
    } else {
        Err(PipelineError::BranchNotAllowed { branch, allowed: allowed.to_vec(), context: None })
    }
}

/// Stages everything, commits with `message` and pushes.
///
/// # Errors
/// The first failing git command.
pub fn commit_and_push(
    runner: &dyn CommandRunner,
    paths: &ProjectPaths,
    message: &str,
) -> Result<(), PipelineError> {
    let root = paths.root();
    for command in [
        CommandLine::new("git", root).args(["add", "."]),
        CommandLine::new("git", root).args(["commit", "-m", message]),
        CommandLine::new("git", root).arg("push"),
    ] {
        runner.run(&command).context("Push to git failed")?;
    }
    Ok(())
}

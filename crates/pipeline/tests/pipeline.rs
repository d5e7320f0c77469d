use dtk_config::{ConfigNode, Setting};
use dtk_pipeline::{
    CommandLine, CommandOutput, CommandRunner, DryRunRunner, Outcome, Pipeline, PipelineError,
    PipelineSettings, ProjectPaths, Step, pipeline_config, version,
};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Records every command, answers `git rev-parse` with `branch` and fails the first command
/// whose rendering starts with `fail_on`.
struct Recorder {
    branch: &'static str,
    fail_on: Option<&'static str>,
    commands: Mutex<Vec<CommandLine>>,
}

impl Recorder {
    fn new(branch: &'static str) -> Self {
        Self { branch, fail_on: None, commands: Mutex::new(Vec::new()) }
    }

    fn failing_on(mut self, prefix: &'static str) -> Self {
        self.fail_on = Some(prefix);
        self
    }

    /// Program plus first argument of each recorded command.
    fn summary(&self) -> Vec<String> {
        self.commands
            .lock()
            .iter()
            .map(|c| match c.arguments().first() {
                Some(first) => format!("{} {first}", c.program()),
                None => c.program().to_owned(),
            })
            .collect()
    }
}

impl CommandRunner for Recorder {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput, PipelineError> {
        self.commands.lock().push(command.clone());
        let rendered = command.to_string();
        if self.fail_on.is_some_and(|prefix| rendered.starts_with(prefix)) {
            return Err(PipelineError::Command {
                command: rendered,
                message: "exit status: 1".to_owned(),
                context: None,
            });
        }
        if command.arguments().first().is_some_and(|a| a == "rev-parse") {
            return Ok(CommandOutput { stdout: format!("{}\n", self.branch), stderr: String::new() });
        }
        Ok(CommandOutput::default())
    }
}

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir(root.join(".git")).unwrap();
    fs::write(root.join("pyproject.toml"), "[project]\nname = \"mypkg\"\n").unwrap();
    fs::create_dir_all(root.join("mypkg/sub")).unwrap();
    fs::write(root.join("mypkg/__init__.py"), "\"\"\"Package.\"\"\"\n__version__ = \"0.1.0\"\n").unwrap();
    fs::create_dir_all(root.join("venv/lib")).unwrap();
    fs::write(root.join("venv/lib/__init__.py"), "").unwrap();
    fs::create_dir_all(root.join("docs/source/_static")).unwrap();
    fs::write(root.join("docs/source/conf.py"), "").unwrap();
    fs::write(root.join("docs/source/index.rst"), "").unwrap();
    fs::write(root.join("docs/source/mypkg.old.rst"), "").unwrap();
    dir
}

fn settings(overrides: &[(&str, Setting)]) -> PipelineSettings {
    let mut config: ConfigNode = pipeline_config().unwrap();
    for (name, value) in overrides {
        config.set(name, value.clone()).unwrap();
    }
    PipelineSettings::from_config(&config).unwrap()
}

fn version_of(root: &Path) -> String {
    version::read_version(&root.join("mypkg/__init__.py")).unwrap()
}

#[test]
fn discovers_root_and_package_from_a_subdirectory() {
    let dir = project();
    let paths = ProjectPaths::discover(dir.path().join("mypkg/sub")).unwrap();

    assert_eq!(paths.root(), dir.path());
    assert_eq!(paths.app().unwrap(), dir.path().join("mypkg"));
    assert_eq!(paths.init().unwrap(), dir.path().join("mypkg/__init__.py"));
    assert_eq!(paths.docs(), dir.path().join("docs"));

    let overridden = paths.with_app(dir.path().join("other"));
    assert_eq!(overridden.init().unwrap(), dir.path().join("other/__init__.py"));
}

#[test]
fn full_run_executes_steps_in_order() {
    let dir = project();
    let paths = ProjectPaths::discover(dir.path()).unwrap();
    let settings = settings(&[("version", "1.0.0".into()), ("generate_readme", true.into())]);
    let runner = Recorder::new("main");

    let report = Pipeline::new(&settings, &paths, &runner).run().unwrap();

    let root = dir.path().display().to_string();
    assert_eq!(
        runner.summary(),
        [
            "git rev-parse".to_owned(),
            format!("pytest {root}"),
            "black .".to_owned(),
            "git add".to_owned(),
            "sphinx-apidoc --module-first".to_owned(),
            "git add".to_owned(),
            "git add".to_owned(),
            "git commit".to_owned(),
            "git push".to_owned(),
        ]
    );
    assert!(
        runner.commands.lock().iter().any(|c| c.to_string() == "git commit -m \"Release 1.0.0\"")
    );
    assert_eq!(version_of(dir.path()), "1.0.0");
    assert_eq!(report.version, Some(("0.1.0".to_owned(), "1.0.0".to_owned())));
    assert!(report.steps.iter().all(|s| s.outcome == Outcome::Done));
    assert_eq!(fs::read_to_string(dir.path().join("README.md")).unwrap(), "Package.");

    let source = dir.path().join("docs/source");
    assert!(source.join("conf.py").exists() && source.join("_static").exists());
    assert!(!source.join("mypkg.old.rst").exists());
}

#[test]
fn failed_push_restores_the_version() {
    let dir = project();
    let paths = ProjectPaths::discover(dir.path()).unwrap();
    let settings = settings(&[]);
    let runner = Recorder::new("master").failing_on("git push");

    let err = Pipeline::new(&settings, &paths, &runner).run().unwrap_err();

    assert!(matches!(err, PipelineError::Command { .. }), "{err}");
    assert!(err.to_string().contains("Push to git failed"), "{err}");
    assert_eq!(version_of(dir.path()), "0.1.0");
}

#[test]
fn failed_tests_stop_before_the_version_bump() {
    let dir = project();
    let paths = ProjectPaths::discover(dir.path()).unwrap();
    let settings = settings(&[]);
    let runner = Recorder::new("master").failing_on("pytest");

    assert!(Pipeline::new(&settings, &paths, &runner).run().is_err());
    assert_eq!(runner.summary().len(), 2);
    assert_eq!(version_of(dir.path()), "0.1.0");
}

#[test]
fn other_branches_are_rejected() {
    let dir = project();
    let paths = ProjectPaths::discover(dir.path()).unwrap();
    let settings = settings(&[]);
    let runner = Recorder::new("feature/x");

    let err = Pipeline::new(&settings, &paths, &runner).run().unwrap_err();

    assert!(
        matches!(&err, PipelineError::BranchNotAllowed { branch, .. } if branch == "feature/x"),
        "{err}"
    );
    assert_eq!(runner.summary(), ["git rev-parse"]);

    let anywhere = self::settings(&[("allowed_branches", dtk_config::Value::Null.into())]);
    let report = Pipeline::new(&anywhere, &paths, &runner).run().unwrap();
    assert_eq!(report.outcome(Step::Branch), Some(&Outcome::Skipped("every branch allowed")));
}

#[test]
fn disabled_steps_are_skipped() {
    let dir = project();
    let paths = ProjectPaths::discover(dir.path()).unwrap();
    let settings = settings(&[
        ("test", false.into()),
        ("reformat", false.into()),
        ("version", "None".into()),
        ("sphinx_docs", false.into()),
        ("commit_and_push_git", false.into()),
    ]);
    let runner = Recorder::new("main");

    let report = Pipeline::new(&settings, &paths, &runner).run().unwrap();

    assert_eq!(runner.summary(), ["git rev-parse"]);
    assert_eq!(report.outcome(Step::Version), Some(&Outcome::Skipped("kept")));
    assert_eq!(report.outcome(Step::Git), Some(&Outcome::Skipped("disabled")));
    assert_eq!(version_of(dir.path()), "0.1.0");
}

#[test]
fn dry_run_touches_no_files() {
    let dir = project();
    let paths = ProjectPaths::discover(dir.path()).unwrap();
    let settings = settings(&[("dry_run", true.into())]);
    let runner = DryRunRunner::new();

    let report = Pipeline::new(&settings, &paths, &runner).run().unwrap();

    assert_eq!(report.outcome(Step::Branch), Some(&Outcome::Skipped("dry run")));
    assert_eq!(report.outcome(Step::Version), Some(&Outcome::Skipped("dry run")));
    assert_eq!(report.version, Some(("0.1.0".to_owned(), "0.1.1".to_owned())));
    assert_eq!(version_of(dir.path()), "0.1.0");
    assert!(dir.path().join("docs/source/mypkg.old.rst").exists());

    let programs: Vec<_> = runner.recorded().iter().map(|c| c.program().to_owned()).collect();
    assert_eq!(programs, ["pytest", "black", "sphinx-apidoc", "git", "git", "git", "git"]);
}

#[test]
fn invalid_version_request_fails_before_any_command() {
    let dir = project();
    let paths = ProjectPaths::discover(dir.path()).unwrap();
    let settings = settings(&[("version", "latest".into())]);
    let runner = Recorder::new("main");

    let err = Pipeline::new(&settings, &paths, &runner).run().unwrap_err();

    assert!(matches!(err, PipelineError::Version { .. }), "{err}");
    assert!(runner.summary().is_empty());
}

#[test]
fn version_rewrite_keeps_quotes_and_other_lines() {
    let dir = tempfile::tempdir().unwrap();
    let init = dir.path().join("__init__.py");
    fs::write(&init, "import os\n__version__ = '2.3.4'  # bumped by dtk\nVALUE = \"x\"\n").unwrap();

    let (previous, current) =
        version::apply_request(&init, dtk_pipeline::VersionRequest::Increment).unwrap();

    assert_eq!((previous.as_str(), current.as_str()), ("2.3.4", "2.3.5"));
    assert_eq!(
        fs::read_to_string(&init).unwrap(),
        "import os\n__version__ = '2.3.5'  # bumped by dtk\nVALUE = \"x\"\n"
    );
}

#[test]
fn readme_is_generated_from_the_package_docstring() {
    let dir = project();
    let root = dir.path();
    fs::write(
        root.join("pkg_init.py"),
        "# header\n\"\"\"My package\n\n    Longer description.\n    \"\"\"\n__version__ = \"3.0.0\"\n",
    )
    .unwrap();
    let paths = ProjectPaths::discover(root)
        .unwrap()
        .with_init(root.join("pkg_init.py"))
        .with_readme(root.join("docs/README.md"));
    let runner = Recorder::new("main");

    dtk_pipeline::steps::generate_readme(&runner, &paths).unwrap();

    assert_eq!(
        fs::read_to_string(root.join("docs/README.md")).unwrap(),
        "My package\n\nLonger description."
    );
    let readme = root.join("docs/README.md").display().to_string();
    assert_eq!(runner.commands.lock()[0].to_string(), format!("git add {readme}"));

    let dry = DryRunRunner::new();
    fs::remove_file(root.join("docs/README.md")).unwrap();
    dtk_pipeline::steps::generate_readme(&dry, &paths).unwrap();
    assert!(!root.join("docs/README.md").exists());
    assert_eq!(dry.recorded().len(), 1);
}

#[test]
fn docs_follow_an_overridden_directory() {
    let dir = project();
    let root = dir.path();
    fs::create_dir_all(root.join("documentation/source")).unwrap();
    fs::write(root.join("documentation/source/stale.rst"), "").unwrap();
    let paths = ProjectPaths::discover(root).unwrap().with_docs(root.join("documentation"));
    let runner = Recorder::new("main");

    dtk_pipeline::steps::regenerate_docs(&runner, &paths).unwrap();

    assert!(!root.join("documentation/source/stale.rst").exists());
    assert!(root.join("docs/source/mypkg.old.rst").exists());
    assert_eq!(runner.commands.lock()[0].cwd(), root.join("documentation"));
}

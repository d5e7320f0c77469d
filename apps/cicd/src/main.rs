use anyhow::Context;
use dtk_config::{ConfigNode, ConfigSources};
use dtk_logger::{Logger, parse_level};
use dtk_pipeline::{
    CommandRunner, DryRunRunner, Pipeline, PipelineSettings, ProjectPaths, SystemRunner,
    pipeline_config,
};
use std::path::PathBuf;
use tracing::info;

const ABOUT: &str = "Release pipeline for Python projects: runs pytest, reformats with black, bumps \
                     __version__, regenerates sphinx-apidoc docs and pushes to git. Every flag can \
                     also be set in ./dtk.toml or as DTK__<NAME> environment variable.";
const CONFIG_FILE: &str = "dtk.toml";
const ENV_PREFIX: &str = "DTK";

fn main() -> anyhow::Result<()> {
    let mut config = pipeline_config().context("Critical: pipeline configuration is malformed")?;
    config
        .apply_sources(&ConfigSources::new().optional_file(CONFIG_FILE).env_prefix(ENV_PREFIX))
        .with_context(|| format!("Invalid settings in {CONFIG_FILE} or {ENV_PREFIX}__* variables"))?;
    config.with_cli(Some(ABOUT));

    let settings = PipelineSettings::from_config(&config)?;
    let _log = Logger::builder()
        .name(env!("CARGO_PKG_NAME"))
        .level(parse_level(&settings.log_level)?)
        .init()?;

    if settings.print_config {
        return print_config(&config);
    }

    let start = match &settings.project_root {
        Some(root) => PathBuf::from(root),
        None => std::env::current_dir()?,
    };
    let paths = ProjectPaths::discover(&start)?;
    let runner: Box<dyn CommandRunner> =
        if settings.dry_run { Box::new(DryRunRunner::new()) } else { Box::new(SystemRunner) };

    info!(root = %paths.root().display(), dry_run = settings.dry_run, "starting pipeline");
    let report = Pipeline::new(&settings, &paths, runner.as_ref()).run()?;
    print_report(&report);

    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_config(config: &ConfigNode) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&config.get_dict()?)?);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_report(report: &dtk_pipeline::Report) {
    println!("\nPipeline finished:\n");
    println!("{report}");
}

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use tracing::info;

use namebank_core::config::NamebankConfig;
use namebank_core::ingest::ingest_json_lines;
use namebank_core::progress::{IndicatifReporter, NoopReporter, ProgressReporter};
use namebank_core::store::EntityStore;

use super::Context;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// JSON-lines file with one raw entity per line
    pub file: PathBuf,

    /// namebank.toml with project, tokenizer and store settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Project name (overrides the config)
    #[arg(long, requires = "project_version")]
    pub project: Option<String>,

    /// Project version (overrides the config)
    #[arg(long = "version", id = "project_version", requires = "project")]
    pub project_version: Option<String>,
}

pub fn run(args: &IngestArgs, ctx: &Context) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => NamebankConfig::load(path)
            .with_context(|| format!("Cannot load config: {}", path.display()))?,
        None => NamebankConfig::default(),
    };
    if let (Some(name), Some(version)) = (&args.project, &args.project_version) {
        config.project.name.clone_from(name);
        config.project.version.clone_from(version);
    }
    if config.project.name.is_empty() {
        anyhow::bail!("No project given: pass --project and --version, or a config with [project]");
    }
    config
        .validate()
        .context("Invalid config for ingest")?;

    let store = EntityStore::open_with_config(&ctx.db, &config)
        .with_context(|| format!("Cannot open database: {}", ctx.db.display()))?;

    let reporter: Box<dyn ProgressReporter> = if ctx.quiet {
        Box::new(NoopReporter)
    } else {
        Box::new(IndicatifReporter::new())
    };
    let report = ingest_json_lines(&store, &args.file, reporter.as_ref())
        .with_context(|| format!("Cannot read entities: {}", args.file.display()))?;

    store.shutdown().context("Failed to close database")?;
    info!(
        project = %config.project.name,
        stored = report.stored,
        "Ingest complete"
    );

    if !ctx.quiet {
        println!(
            "Stored {} entities for {} {}",
            report.stored, config.project.name, config.project.version
        );
    }
    if !report.is_clean() {
        for failure in &report.failures {
            eprintln!("  line {}: {}", failure.line, failure.message);
        }
        anyhow::bail!(
            "Partial ingest: {} of {} lines failed",
            report.failures.len(),
            report.failures.len() + report.stored
        );
    }
    Ok(())
}

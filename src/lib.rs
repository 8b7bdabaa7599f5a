//! dupwalk - Resumable duplicate file finder
//!
//! Finds duplicate files across one or more directory trees in four stages:
//! walk, size, hash and group. Every stage records its progress in a plain
//! text checkpoint log, so an interrupted run continues where it stopped.
//! Duplicates are reported grouped by the set of directories they live in.
//!
//! # Architecture
//!
//! * [`snapshot`]: Ordered, positionally indexed record of every file.
//! * [`stage`]: Checkpointed size and hash stages with resume verification.
//! * [`analysis`]: Grouping of hashed files into a [`analysis::Report`].
//! * [`pipeline`]: Step-driven orchestration and the host callback trait.
//! * [`progress`], [`output`], [`cli`], [`config`]: The command-line host.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod signal;
pub mod snapshot;
pub mod stage;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::output::{JsonOutput, Summary, TextOutput};
use crate::pipeline::{Pipeline, PipelineStatus};
use crate::progress::Progress;

/// Run the command-line application.
///
/// Cancellation with Ctrl+C is a clean exit: the checkpoint logs keep every
/// finished record and the next run resumes from them.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the temp-data
/// directory cannot be created, or any pipeline stage fails.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref())
        .map_err(|e| *e)
        .context("Failed to load configuration")?;
    config.apply_cli(&cli);
    config.temp_datadir = absolute(&config.temp_datadir)?;
    config.ignore = config
        .ignore
        .iter()
        .map(|dir| absolute(dir))
        .collect::<anyhow::Result<_>>()?;
    let roots = cli
        .folders
        .iter()
        .map(|dir| absolute(dir))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let options = config.pipeline_options(roots);
    options.paths.ensure_dir().with_context(|| {
        format!(
            "Failed to create temp-data directory {}",
            options.paths.dir().display()
        )
    })?;
    log::debug!("Using temp-data directory {}", options.paths.dir().display());

    let shutdown = signal::install_handler()?;
    let progress = Progress::new(cli.quiet || cli.no_progress, shutdown);
    let mut pipeline = Pipeline::new(options, progress);
    let status = pipeline.run();
    let mut progress = pipeline.into_callback();

    match status {
        PipelineStatus::Finished => {
            let report = progress.take_report().unwrap_or_default();
            let summary = Summary::new(&report, progress.total_files(), progress.total_bytes());
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            match cli.output {
                OutputFormat::Text => TextOutput::new(&report, &summary).write_to(&mut out)?,
                OutputFormat::Json => {
                    JsonOutput::new(&report, summary, ExitCode::Success).write_to(&mut out)?;
                }
            }
            out.flush()?;
            Ok(ExitCode::Success)
        }
        PipelineStatus::Cancelled => {
            log::info!(
                "Cancelled; run again with the same temp-data directory to resume from {}",
                config.temp_datadir.display()
            );
            Ok(ExitCode::Success)
        }
        PipelineStatus::Failed => match progress.failure() {
            Some((stage, message)) => Err(anyhow::anyhow!("{message}").context(format!("{stage} failed"))),
            None => Err(anyhow::anyhow!("Pipeline failed")),
        },
        PipelineStatus::Running => Ok(ExitCode::Success),
    }
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path {}", path.display()))
}

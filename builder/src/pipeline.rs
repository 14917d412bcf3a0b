//! Staging and build pipeline orchestration.
//!
//! This module sequences the stager and the retrying runner: packages are
//! staged first and the compose build only starts once every required
//! package is in place.

use crate::artifact::preview_flattened;
use crate::compose::compose_build_command;
use crate::config::Settings;
use crate::error::Result;
use crate::output::{dry_run_lines, staging_summary, write_stderr_line};
use crate::routing::RoutingRule;
use crate::runner::{CommandExecutor, CommandSpec, RunSummary, Runner, Sleeper};
use crate::stager::{Stager, StagingReport};
use log::info;
use std::io::Write;

/// Context for a pipeline run.
pub struct PipelineContext<'a> {
    /// Resolved run settings.
    pub settings: &'a Settings,
    /// Routing table used for staging.
    pub rules: &'a [RoutingRule],
    /// Stop after staging.
    pub skip_build: bool,
    /// Suppress the staging summary.
    pub quiet: bool,
}

impl PipelineContext<'_> {
    fn stager(&self) -> Stager {
        Stager::new(
            self.settings.artifact_dir.clone(),
            self.settings.compose_dir.clone(),
        )
    }

    /// The compose build command these settings produce.
    #[must_use]
    pub fn build_command(&self) -> CommandSpec {
        compose_build_command(
            &self.settings.progress,
            &self.settings.compose_files,
            &self.settings.compose_dir,
        )
    }
}

/// What a completed pipeline did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// Staging results.
    pub staging: StagingReport,
    /// Build results, absent when the build was skipped.
    pub build: Option<RunSummary>,
}

/// Stages packages and prints a summary unless quiet.
///
/// # Errors
///
/// Returns an error if staging fails.
pub fn stage_packages(
    context: &PipelineContext<'_>,
    stderr: &mut dyn Write,
) -> Result<StagingReport> {
    let report = context.stager().stage(context.rules)?;
    if !context.quiet {
        write_stderr_line(stderr, staging_summary(&report));
    }
    Ok(report)
}

/// Runs the compose build with the configured retry policy.
///
/// # Errors
///
/// Returns an error once every attempt has failed.
pub fn build_images(
    context: &PipelineContext<'_>,
    executor: &dyn CommandExecutor,
    sleeper: &dyn Sleeper,
) -> Result<RunSummary> {
    let command = context.build_command();
    let runner = Runner::new(executor, sleeper, context.settings.retry);
    let summary = runner.run(&command)?;
    info!(
        "Images built after {} attempt(s)",
        summary.attempts
    );
    Ok(summary)
}

/// Stages packages, then builds the images.
///
/// # Errors
///
/// Returns the first staging error, in which case the build never starts,
/// or the build error once retries are exhausted.
pub fn run_pipeline(
    context: &PipelineContext<'_>,
    executor: &dyn CommandExecutor,
    sleeper: &dyn Sleeper,
    stderr: &mut dyn Write,
) -> Result<PipelineOutcome> {
    let staging = stage_packages(context, stderr)?;

    if context.skip_build {
        info!("Skipping image build");
        return Ok(PipelineOutcome {
            staging,
            build: None,
        });
    }

    let build = build_images(context, executor, sleeper)?;
    Ok(PipelineOutcome {
        staging,
        build: Some(build),
    })
}

/// Prints the staging plan and build command without side effects.
///
/// # Errors
///
/// Returns an error if the artifact tree cannot be read or a required
/// package is missing.
pub fn dry_run(context: &PipelineContext<'_>, stderr: &mut dyn Write) -> Result<()> {
    let stager = context.stager();
    let artifacts = preview_flattened(stager.artifact_dir())?;
    let plan = stager.plan(&artifacts, context.rules)?;

    for line in dry_run_lines(context.settings, &plan, &context.build_command()) {
        write_stderr_line(stderr, line);
    }
    Ok(())
}

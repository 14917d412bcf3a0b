//! CLI argument definitions for the CDN-in-a-Box builder.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::Utf8PathBuf;
use clap::Parser;
use log::LevelFilter;

/// Stage CDN-in-a-Box packages and build its images.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ciab-build")]
#[command(version, about)]
#[command(long_about = concat!(
    "Stage CDN-in-a-Box packages and build its images.\n\n",
    "Packages produced by earlier CI steps are moved from the subdirectories of ",
    "<workspace>/dist up into dist itself, then copied to the fixed locations the ",
    "CDN-in-a-Box compose files expect. Finally `docker compose build --parallel` ",
    "is run from <workspace>/infrastructure/cdn-in-a-box, retrying failed builds.\n\n",
    "Flags take precedence over the environment variables listed below.",
))]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  GITHUB_WORKSPACE                  Workspace root (same as --workspace)\n",
    "  CIAB_DOCKER_BUILD_PROGRESS        Build progress mode [default: auto]\n",
    "  CIAB_BUILD_RETRIES                Retries after a failed build [default: 2]\n",
    "  CIAB_BUILD_RETRY_DELAY_SECONDS    Seconds between retries [default: 20]\n\n",
    "EXAMPLES:\n",
    "  Stage and build from a CI checkout:\n",
    "    $ ciab-build --workspace \"$GITHUB_WORKSPACE\"\n\n",
    "  Stage packages without building:\n",
    "    $ ciab-build --skip-build\n\n",
    "  Preview the staging plan and build command:\n",
    "    $ ciab-build --dry-run",
))]
pub struct Cli {
    /// Workspace root containing dist/ and infrastructure/cdn-in-a-box/.
    #[arg(short, long, value_name = "DIR")]
    pub workspace: Option<Utf8PathBuf>,

    /// Directory holding built packages [default: <workspace>/dist].
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<Utf8PathBuf>,

    /// Compose directory [default: <workspace>/infrastructure/cdn-in-a-box].
    #[arg(long, value_name = "DIR")]
    pub compose_dir: Option<Utf8PathBuf>,

    /// Progress display mode passed to docker compose and BuildKit.
    #[arg(long, value_name = "MODE")]
    pub progress: Option<String>,

    /// Retries after a failed build; invalid values fall back to 2.
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    pub retries: Option<String>,

    /// Seconds to wait between build attempts; invalid values fall back to 20.
    #[arg(long, value_name = "SECONDS", allow_hyphen_values = true)]
    pub retry_delay: Option<String>,

    /// Compose file passed with -f (repeatable) [default: docker-compose.yml,
    /// docker-compose.readiness.yml].
    #[arg(short = 'f', long = "compose-file", value_name = "FILE")]
    pub compose_files: Vec<String>,

    /// Stage packages and stop without building images.
    #[arg(long)]
    pub skip_build: bool,

    /// Show the staging plan and build command without side effects.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log warnings and errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Log level selected by the verbosity flags.
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

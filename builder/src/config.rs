//! Run configuration resolved from flags and the environment.
//!
//! Each setting is taken from its CLI flag first, then from its environment
//! variable, then from a default. Retry settings never fail to parse: an
//! invalid value logs a warning and falls back to the default.

use crate::cli::Cli;
use crate::compose::{DEFAULT_PROGRESS, default_compose_files};
use crate::error::{BuilderError, Result};
use crate::runner::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, RetryPolicy};
use camino::Utf8PathBuf;
use log::{debug, warn};
use std::time::Duration;

/// Environment variable naming the workspace root.
pub const WORKSPACE_ENV: &str = "GITHUB_WORKSPACE";

/// Environment variable selecting the build progress mode.
pub const PROGRESS_ENV: &str = "CIAB_DOCKER_BUILD_PROGRESS";

/// Environment variable holding the retry count.
pub const RETRIES_ENV: &str = "CIAB_BUILD_RETRIES";

/// Environment variable holding the delay between retries, in seconds.
pub const RETRY_DELAY_ENV: &str = "CIAB_BUILD_RETRY_DELAY_SECONDS";

/// Package output directory, relative to the workspace root.
pub const ARTIFACT_SUBDIR: &str = "dist";

/// Compose directory, relative to the workspace root.
pub const COMPOSE_SUBDIR: &str = "infrastructure/cdn-in-a-box";

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Workspace root, when one was configured.
    pub workspace_root: Option<Utf8PathBuf>,
    /// Directory holding built packages.
    pub artifact_dir: Utf8PathBuf,
    /// Directory the compose build runs in and packages are staged below.
    pub compose_dir: Utf8PathBuf,
    /// Progress display mode.
    pub progress: String,
    /// Retry behaviour for the build command.
    pub retry: RetryPolicy,
    /// Compose files passed with `-f`.
    pub compose_files: Vec<String>,
}

impl Settings {
    /// Resolve settings from `cli` and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::WorkspaceNotSet`] when a directory depends on a
    /// workspace root that was not given.
    pub fn from_env(cli: &Cli) -> Result<Self> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Resolve settings from `cli`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::WorkspaceNotSet`] when a directory depends on a
    /// workspace root that was not given.
    pub fn resolve<F>(cli: &Cli, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |flag: Option<&String>, key: &str| {
            flag.cloned()
                .or_else(|| lookup(key))
                .filter(|v| !v.trim().is_empty())
        };

        let workspace_root = cli
            .workspace
            .clone()
            .or_else(|| value(None, WORKSPACE_ENV).map(Utf8PathBuf::from));
        let under_workspace = |relative: &str| {
            workspace_root
                .as_ref()
                .map(|root| root.join(relative))
                .ok_or(BuilderError::WorkspaceNotSet {
                    variable: WORKSPACE_ENV,
                })
        };

        let artifact_dir = match &cli.dist_dir {
            Some(dir) => dir.clone(),
            None => under_workspace(ARTIFACT_SUBDIR)?,
        };
        let compose_dir = match &cli.compose_dir {
            Some(dir) => dir.clone(),
            None => under_workspace(COMPOSE_SUBDIR)?,
        };

        let progress = value(cli.progress.as_ref(), PROGRESS_ENV)
            .unwrap_or_else(|| DEFAULT_PROGRESS.to_owned());
        let retries = parse_retries(value(cli.retries.as_ref(), RETRIES_ENV).as_deref());
        let delay = parse_retry_delay(value(cli.retry_delay.as_ref(), RETRY_DELAY_ENV).as_deref());
        let compose_files = if cli.compose_files.is_empty() {
            default_compose_files()
        } else {
            cli.compose_files.clone()
        };

        let settings = Self {
            workspace_root,
            artifact_dir,
            compose_dir,
            progress,
            retry: RetryPolicy::new(retries, delay),
            compose_files,
        };
        debug!("resolved settings: {settings:?}");
        Ok(settings)
    }
}

/// Parse a retry count, falling back to [`DEFAULT_RETRIES`].
///
/// Anything other than a non-negative integer is rejected.
///
/// # Example
///
/// ```
/// use ciab_builder::config::parse_retries;
///
/// assert_eq!(parse_retries(Some("5")), 5);
/// assert_eq!(parse_retries(Some("-1")), 2);
/// assert_eq!(parse_retries(None), 2);
/// ```
#[must_use]
pub fn parse_retries(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_RETRIES;
    };
    match raw.trim().parse::<i64>().ok().and_then(|n| u32::try_from(n).ok()) {
        Some(retries) => retries,
        None => {
            warn!("ignoring invalid retry count {raw:?}; using {DEFAULT_RETRIES}");
            DEFAULT_RETRIES
        }
    }
}

/// Parse a retry delay in seconds, falling back to [`DEFAULT_RETRY_DELAY`].
///
/// Anything other than a positive integer is rejected.
#[must_use]
pub fn parse_retry_delay(raw: Option<&str>) -> Duration {
    let Some(raw) = raw else {
        return DEFAULT_RETRY_DELAY;
    };
    match raw
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|&n| n > 0)
        .and_then(|n| u64::try_from(n).ok())
    {
        Some(seconds) => Duration::from_secs(seconds),
        None => {
            warn!(
                "ignoring invalid retry delay {raw:?}; using {}s",
                DEFAULT_RETRY_DELAY.as_secs()
            );
            DEFAULT_RETRY_DELAY
        }
    }
}

//! Error types for the CDN-in-a-Box builder.
//!
//! Every failure is surfaced as a [`BuilderError`] and propagated to the
//! binary entrypoint, which is the only place that terminates the process.
//! [`BuilderError::exit_code`] decides the status that run ends with.

use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while staging packages or running the build.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// Neither `--workspace` nor the workspace environment variable was set.
    #[error("workspace root not set; pass --workspace or set {variable}")]
    WorkspaceNotSet {
        /// Name of the environment variable that was consulted.
        variable: &'static str,
    },

    /// The package output directory does not exist.
    #[error("artifact directory {path} not found")]
    ArtifactDirNotFound {
        /// Directory that was expected to hold build outputs.
        path: Utf8PathBuf,
    },

    /// Walking the package output tree failed.
    #[error("failed to scan {path}: {reason}")]
    ScanFailed {
        /// Directory being scanned.
        path: Utf8PathBuf,
        /// Description of the underlying walk error.
        reason: String,
    },

    /// A discovered path is not valid UTF-8.
    #[error("path {} is not valid UTF-8", path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// Moving a package into the flat artifact root failed.
    #[error("failed to move {from} to {to}")]
    FlattenFailed {
        /// Original location of the package.
        from: Utf8PathBuf,
        /// Intended location at the artifact root.
        to: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A required package was not produced by the upstream build.
    #[error("missing required package {description} (matching \"{pattern}\") for {destination}")]
    MissingArtifact {
        /// Human-readable description of the package role.
        description: &'static str,
        /// Substring the package file name must contain.
        pattern: &'static str,
        /// Destination the package would have been staged to.
        destination: Utf8PathBuf,
    },

    /// Copying a package into the compose tree failed.
    #[error("staging failed: {reason}")]
    StagingFailed {
        /// Description of the staging failure.
        reason: String,
    },

    /// The build command kept failing after every permitted attempt.
    #[error("{command} exited with status code {exit_code} after {attempts} attempt(s)")]
    RetriesExhausted {
        /// Display form of the command that was run.
        command: String,
        /// Number of attempts made.
        attempts: u64,
        /// Exit code observed on the final attempt.
        exit_code: i32,
    },
}

impl BuilderError {
    /// Returns the process exit code this error should terminate with.
    ///
    /// Retry exhaustion propagates the failing child's status; every other
    /// failure exits with 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RetriesExhausted { exit_code, .. } if *exit_code != 0 => *exit_code,
            _ => 1,
        }
    }
}

/// Result type alias using [`BuilderError`].
pub type Result<T> = std::result::Result<T, BuilderError>;

//! Package staging into the compose build contexts.
//!
//! This module flattens the artifact root, routes packages through a routing
//! table, and copies each selected package to its fixed destination in the
//! compose directory.

use crate::artifact::{self, Artifact, FlattenReport};
use crate::error::{BuilderError, Result};
use crate::routing::{RoutePlan, RoutingRule, plan_routes};
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use std::fs;

/// A package copied into the compose tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    /// Package role from the routing rule.
    pub description: &'static str,
    /// Package file that was copied.
    pub source: Utf8PathBuf,
    /// Where it was copied to.
    pub destination: Utf8PathBuf,
}

/// Summary of a staging run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    /// Outcome of flattening the artifact root.
    pub flattened: FlattenReport,
    /// Packages copied into place, in routing table order.
    pub staged: Vec<StagedArtifact>,
    /// Descriptions of optional rules that matched nothing.
    pub unmatched_optional: Vec<&'static str>,
}

/// Moves packages from the artifact root into the compose directory.
#[derive(Debug, Clone)]
pub struct Stager {
    artifact_dir: Utf8PathBuf,
    destination_root: Utf8PathBuf,
}

impl Stager {
    /// Create a stager reading from `artifact_dir` and writing below
    /// `destination_root`.
    #[must_use]
    pub fn new(artifact_dir: Utf8PathBuf, destination_root: Utf8PathBuf) -> Self {
        Self {
            artifact_dir,
            destination_root,
        }
    }

    /// Directory holding the build outputs.
    #[must_use]
    pub fn artifact_dir(&self) -> &Utf8Path {
        &self.artifact_dir
    }

    /// Directory routing destinations are relative to.
    #[must_use]
    pub fn destination_root(&self) -> &Utf8Path {
        &self.destination_root
    }

    /// Flatten the artifact root, then stage every routed package.
    ///
    /// All rules are resolved before the first copy, so a missing required
    /// package leaves the compose tree untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if flattening fails, a required package is missing,
    /// or a copy fails.
    pub fn stage(&self, rules: &[RoutingRule]) -> Result<StagingReport> {
        info!("Flattening packages into {}", self.artifact_dir);
        let flattened = artifact::flatten(&self.artifact_dir)?;
        let artifacts = artifact::discover(&self.artifact_dir)?;
        info!(
            "Found {} package(s) in {}",
            artifacts.len(),
            self.artifact_dir
        );

        let plan = self.plan(&artifacts, rules)?;
        let staged = plan
            .routes
            .iter()
            .map(|route| self.copy(route.rule, &route.artifact))
            .collect::<Result<Vec<_>>>()?;

        Ok(StagingReport {
            flattened,
            staged,
            unmatched_optional: plan
                .unmatched_optional
                .iter()
                .map(|rule| rule.description)
                .collect(),
        })
    }

    /// Match `artifacts` against `rules` without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns an error if a required package is missing.
    pub fn plan<'r>(
        &self,
        artifacts: &[Artifact],
        rules: &'r [RoutingRule],
    ) -> Result<RoutePlan<'r>> {
        plan_routes(artifacts, rules, &self.destination_root)
    }

    /// Copy one package to the destination named by `rule`.
    ///
    /// Missing parent directories are created and an existing destination is
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created or the copy
    /// fails.
    pub fn copy(&self, rule: &RoutingRule, artifact: &Artifact) -> Result<StagedArtifact> {
        let destination = self.destination_root.join(rule.destination);

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| BuilderError::StagingFailed {
                reason: format!("failed to create {parent}: {e}"),
            })?;
        }

        fs::copy(artifact.path(), &destination).map_err(|e| BuilderError::StagingFailed {
            reason: format!(
                "failed to copy {} to {destination}: {e}",
                artifact.path()
            ),
        })?;
        info!(
            "Staged {} ({}) at {destination}",
            rule.description,
            artifact.file_name()
        );

        Ok(StagedArtifact {
            description: rule.description,
            source: artifact.path().to_owned(),
            destination,
        })
    }
}

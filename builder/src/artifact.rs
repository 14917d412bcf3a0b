//! Package artifact discovery and flattening.
//!
//! Upstream builds drop their packages into per-project subdirectories of the
//! artifact root (`dist/`). This module finds those packages, moves them up to
//! the root so they sit side by side, and lists what ended up there.

use crate::error::{BuilderError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::collections::HashSet;
use std::fs;
use walkdir::WalkDir;

/// File name suffix identifying a package artifact.
pub const PACKAGE_EXTENSION: &str = ".rpm";

/// File name suffix identifying a source package.
pub const SOURCE_PACKAGE_SUFFIX: &str = ".src.rpm";

/// A package file discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: Utf8PathBuf,
    file_name: String,
    name: String,
}

impl Artifact {
    /// Wraps `path` if its file name carries the package extension.
    ///
    /// The extension check is case-insensitive. Returns `None` for paths
    /// without a file name or with any other extension.
    #[must_use]
    pub fn from_path(path: Utf8PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_owned();
        let name = file_name.to_lowercase();
        if !name.ends_with(PACKAGE_EXTENSION) {
            return None;
        }
        Some(Self {
            path,
            file_name,
            name,
        })
    }

    /// Location of the package on disk.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Base file name as it appears on disk.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Lowercased file name used for matching.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` for source packages (`*.src.rpm`).
    #[must_use]
    pub fn is_source_package(&self) -> bool {
        self.name.ends_with(SOURCE_PACKAGE_SUFFIX)
    }
}

/// Outcome of flattening the artifact root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenReport {
    /// New root-level locations of packages that were moved.
    pub moved: Vec<Utf8PathBuf>,
    /// Nested packages left in place because the root already had that name.
    pub skipped: Vec<Utf8PathBuf>,
}

/// Moves every package below a subdirectory of `root` up into `root`.
///
/// Packages keep their base file name. When a file of that name already sits
/// at the root, the nested copy is left alone, so running this twice is a
/// no-op.
///
/// # Errors
///
/// Returns an error if `root` is missing, the tree cannot be walked, or a
/// rename fails.
pub fn flatten(root: &Utf8Path) -> Result<FlattenReport> {
    let nested = nested_packages(root)?;
    let mut report = FlattenReport::default();

    for artifact in nested {
        let destination = root.join(artifact.file_name());
        if destination.exists() {
            debug!(
                "{} already present at the artifact root; leaving {} in place",
                artifact.file_name(),
                artifact.path()
            );
            report.skipped.push(artifact.path);
            continue;
        }

        trace!("moving {} to {destination}", artifact.path());
        fs::rename(artifact.path(), &destination).map_err(|source| {
            BuilderError::FlattenFailed {
                from: artifact.path.clone(),
                to: destination.clone(),
                source,
            }
        })?;
        report.moved.push(destination);
    }

    Ok(report)
}

/// Lists the packages sitting directly in `root`, sorted by file name.
///
/// # Errors
///
/// Returns an error if `root` is missing or cannot be read.
pub fn discover(root: &Utf8Path) -> Result<Vec<Artifact>> {
    let walker = WalkDir::new(root).min_depth(1).max_depth(1);
    let mut artifacts = collect_packages(root, walker)?;
    artifacts.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(artifacts)
}

/// Lists packages that live below a subdirectory of `root`.
///
/// Directories are visited in file name order.
///
/// # Errors
///
/// Returns an error if `root` is missing or the tree cannot be walked.
pub fn nested_packages(root: &Utf8Path) -> Result<Vec<Artifact>> {
    collect_packages(root, WalkDir::new(root).min_depth(2))
}

/// Predicts what [`discover`] would return after [`flatten`], without
/// touching the filesystem.
///
/// # Errors
///
/// Returns an error if `root` is missing or the tree cannot be walked.
pub fn preview_flattened(root: &Utf8Path) -> Result<Vec<Artifact>> {
    let mut artifacts = discover(root)?;
    let mut seen: HashSet<String> = artifacts.iter().map(|a| a.file_name.clone()).collect();

    for artifact in nested_packages(root)? {
        if seen.insert(artifact.file_name.clone()) {
            artifacts.push(artifact);
        }
    }

    artifacts.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(artifacts)
}

fn collect_packages(root: &Utf8Path, walker: WalkDir) -> Result<Vec<Artifact>> {
    if !root.is_dir() {
        return Err(BuilderError::ArtifactDirNotFound {
            path: root.to_owned(),
        });
    }

    let mut artifacts = Vec::new();
    for entry in walker.sort_by_file_name() {
        let entry = entry.map_err(|e| BuilderError::ScanFailed {
            path: root.to_owned(),
            reason: e.to_string(),
        })?;
        // Links are not followed while walking, but a link to a package
        // file is still a package.
        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(entry.into_path())
            .map_err(|path| BuilderError::NonUtf8Path { path })?;
        if let Some(artifact) = Artifact::from_path(path) {
            artifacts.push(artifact);
        }
    }

    Ok(artifacts)
}

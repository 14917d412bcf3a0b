//! User-facing summaries written to stderr.
//!
//! Progress and diagnostics go through the `log` facade; this module renders
//! the end-of-step summaries and the dry-run report.

use crate::config::Settings;
use crate::routing::RoutePlan;
use crate::runner::CommandSpec;
use crate::stager::StagingReport;
use std::io::Write;

/// Format a summary of a completed staging run.
///
/// # Example
///
/// ```
/// use ciab_builder::output::staging_summary;
/// use ciab_builder::stager::StagingReport;
///
/// let summary = staging_summary(&StagingReport::default());
/// assert!(summary.starts_with("Staged 0 packages"));
/// ```
#[must_use]
pub fn staging_summary(report: &StagingReport) -> String {
    let count = report.staged.len();
    let plural = if count == 1 { "package" } else { "packages" };
    let mut summary = format!(
        "Staged {count} {plural} ({} moved into the artifact root, {} duplicate(s) left in place)",
        report.flattened.moved.len(),
        report.flattened.skipped.len()
    );
    for staged in &report.staged {
        summary.push_str(&format!(
            "\n  {} -> {}",
            staged.description, staged.destination
        ));
    }
    for description in &report.unmatched_optional {
        summary.push_str(&format!("\n  {description}: not built, skipped"));
    }
    summary
}

/// Lines describing what a dry run would do.
#[must_use]
pub fn dry_run_lines(settings: &Settings, plan: &RoutePlan<'_>, command: &CommandSpec) -> Vec<String> {
    let mut lines = vec![
        "Dry run - no files will be modified".to_owned(),
        String::new(),
    ];
    if let Some(root) = &settings.workspace_root {
        lines.push(format!("Workspace root: {root}"));
    }
    lines.push(format!("Artifact directory: {}", settings.artifact_dir));
    lines.push(format!("Compose directory: {}", settings.compose_dir));
    lines.push(format!("Progress: {}", settings.progress));
    lines.push(format!(
        "Retries: {} (delay {}s)",
        settings.retry.retries,
        settings.retry.delay.as_secs()
    ));
    lines.push(String::new());
    lines.push("Packages to stage:".to_owned());
    for route in &plan.routes {
        lines.push(format!(
            "  - {} -> {}",
            route.artifact.file_name(),
            settings.compose_dir.join(route.rule.destination)
        ));
    }
    for rule in &plan.unmatched_optional {
        lines.push(format!("  - {} (optional, not built)", rule.description));
    }
    lines.push(String::new());
    lines.push(format!("Build command: {command}"));
    for (key, value) in command.envs() {
        lines.push(format!("  {key}={value}"));
    }
    lines
}

/// Writes a line to stderr, ignoring failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, FlattenReport};
    use crate::compose::compose_build_command;
    use crate::routing::{CIAB_ROUTES, Route};
    use crate::runner::RetryPolicy;
    use crate::stager::StagedArtifact;
    use camino::{Utf8Path, Utf8PathBuf};

    #[test]
    fn summary_lists_destinations_and_skipped_roles() {
        let report = StagingReport {
            flattened: FlattenReport {
                moved: vec![Utf8PathBuf::from("/dist/traffic_ops-8.rpm")],
                skipped: Vec::new(),
            },
            staged: vec![StagedArtifact {
                description: "Traffic Ops",
                source: Utf8PathBuf::from("/dist/traffic_ops-8.rpm"),
                destination: Utf8PathBuf::from("/ciab/traffic_ops/traffic_ops.rpm"),
            }],
            unmatched_optional: vec!["Traffic Portal v2"],
        };

        let summary = staging_summary(&report);

        assert!(summary.starts_with("Staged 1 package (1 moved"));
        assert!(summary.contains("Traffic Ops -> /ciab/traffic_ops/traffic_ops.rpm"));
        assert!(summary.contains("Traffic Portal v2: not built, skipped"));
    }

    #[test]
    fn dry_run_shows_plan_and_command() {
        let settings = Settings {
            workspace_root: Some(Utf8PathBuf::from("/ws")),
            artifact_dir: Utf8PathBuf::from("/ws/dist"),
            compose_dir: Utf8PathBuf::from("/ws/ciab"),
            progress: "plain".to_owned(),
            retry: RetryPolicy::default(),
            compose_files: vec!["docker-compose.yml".to_owned()],
        };
        let artifact =
            Artifact::from_path(Utf8PathBuf::from("/ws/dist/trafficserver-9.rpm")).expect("package");
        let plan = RoutePlan {
            routes: vec![Route {
                rule: &CIAB_ROUTES[0],
                artifact,
                candidates: 1,
            }],
            unmatched_optional: Vec::new(),
        };
        let command = compose_build_command("plain", &settings.compose_files, Utf8Path::new("/ws/ciab"));

        let lines = dry_run_lines(&settings, &plan, &command);

        assert!(lines.contains(&"Workspace root: /ws".to_owned()));
        assert!(lines.contains(&"  - trafficserver-9.rpm -> /ws/ciab/cache/trafficserver.rpm".to_owned()));
        assert!(lines.contains(&"Retries: 2 (delay 20s)".to_owned()));
        assert!(lines.iter().any(|l| l.starts_with("Build command: docker compose --progress=plain")));
        assert!(lines.contains(&"  DOCKER_BUILDKIT=1".to_owned()));
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }
}

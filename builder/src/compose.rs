//! `docker compose build` invocation for CDN-in-a-Box.

use crate::runner::CommandSpec;
use camino::Utf8Path;

/// Container CLI used to drive compose.
pub const DOCKER_PROGRAM: &str = "docker";

/// Compose files passed to every build, in order.
pub const DEFAULT_COMPOSE_FILES: &[&str] = &["docker-compose.yml", "docker-compose.readiness.yml"];

/// Progress display mode used when none is configured.
pub const DEFAULT_PROGRESS: &str = "auto";

/// Build the command that builds every CDN-in-a-Box image in parallel.
///
/// BuildKit is switched on through the child's environment, and the
/// progress mode is applied both to compose and to BuildKit itself.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use ciab_builder::compose::compose_build_command;
///
/// let files = vec!["docker-compose.yml".to_owned()];
/// let cmd = compose_build_command("plain", &files, Utf8Path::new("/ciab"));
///
/// assert_eq!(
///     cmd.to_string(),
///     "docker compose --progress=plain -f docker-compose.yml build --parallel"
/// );
/// assert_eq!(cmd.env_value("BUILDKIT_PROGRESS"), Some("plain"));
/// ```
#[must_use]
pub fn compose_build_command(
    progress: &str,
    compose_files: &[String],
    working_dir: &Utf8Path,
) -> CommandSpec {
    let mut cmd = CommandSpec::new(DOCKER_PROGRAM)
        .arg("compose")
        .arg(format!("--progress={progress}"));

    for file in compose_files {
        cmd = cmd.arg("-f").arg(file.as_str());
    }

    cmd.args(["build", "--parallel"])
        .env("DOCKER_BUILDKIT", "1")
        .env("COMPOSE_DOCKER_CLI_BUILD", "1")
        .env("BUILDKIT_PROGRESS", progress)
        .current_dir(working_dir)
}

/// The default compose file list as owned strings.
#[must_use]
pub fn default_compose_files() -> Vec<String> {
    DEFAULT_COMPOSE_FILES
        .iter()
        .map(|&file| file.to_owned())
        .collect()
}

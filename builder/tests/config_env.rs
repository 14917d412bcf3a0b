//! Settings resolution against the real process environment.
//!
//! These tests exercise `Settings::from_env`, which reads variables with
//! `std::env::var`. `temp_env` serialises access so the cases do not race.

use camino::Utf8PathBuf;
use ciab_builder::cli::Cli;
use ciab_builder::config::{
    PROGRESS_ENV, RETRIES_ENV, RETRY_DELAY_ENV, Settings, WORKSPACE_ENV,
};
use ciab_builder::error::BuilderError;
use std::time::Duration;

const ALL_VARS: [&str; 4] = [WORKSPACE_ENV, PROGRESS_ENV, RETRIES_ENV, RETRY_DELAY_ENV];

fn cleared_except<'a>(set: &[(&'a str, &'a str)]) -> Vec<(&'a str, Option<&'a str>)> {
    ALL_VARS
        .iter()
        .map(|&key| {
            let value = set.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
            (key, value)
        })
        .collect()
}

#[test]
fn environment_supplies_every_setting() {
    let vars = cleared_except(&[
        (WORKSPACE_ENV, "/github/workspace"),
        (PROGRESS_ENV, "plain"),
        (RETRIES_ENV, "4"),
        (RETRY_DELAY_ENV, "5"),
    ]);

    let settings = temp_env::with_vars(vars, || Settings::from_env(&Cli::default()))
        .expect("settings should resolve");

    assert_eq!(
        settings.artifact_dir,
        Utf8PathBuf::from("/github/workspace/dist")
    );
    assert_eq!(
        settings.compose_dir,
        Utf8PathBuf::from("/github/workspace/infrastructure/cdn-in-a-box")
    );
    assert_eq!(settings.progress, "plain");
    assert_eq!(settings.retry.retries, 4);
    assert_eq!(settings.retry.delay, Duration::from_secs(5));
}

#[test]
fn missing_workspace_is_reported() {
    let vars = cleared_except(&[]);

    let result = temp_env::with_vars(vars, || Settings::from_env(&Cli::default()));

    assert!(matches!(
        result,
        Err(BuilderError::WorkspaceNotSet {
            variable: "GITHUB_WORKSPACE"
        })
    ));
}

#[test]
fn invalid_retry_values_fall_back_to_defaults() {
    let vars = cleared_except(&[
        (WORKSPACE_ENV, "/ws"),
        (RETRIES_ENV, "lots"),
        (RETRY_DELAY_ENV, "0"),
    ]);

    let settings = temp_env::with_vars(vars, || Settings::from_env(&Cli::default()))
        .expect("settings should resolve");

    assert_eq!(settings.retry.retries, 2);
    assert_eq!(settings.retry.delay, Duration::from_secs(20));
    assert_eq!(settings.progress, "auto");
}

#[test]
fn flags_override_the_environment() {
    let vars = cleared_except(&[
        (WORKSPACE_ENV, "/from-env"),
        (PROGRESS_ENV, "tty"),
        (RETRIES_ENV, "9"),
    ]);
    let cli = Cli {
        workspace: Some(Utf8PathBuf::from("/from-flag")),
        progress: Some("quiet".to_owned()),
        retries: Some("0".to_owned()),
        ..Cli::default()
    };

    let settings =
        temp_env::with_vars(vars, || Settings::from_env(&cli)).expect("settings should resolve");

    assert_eq!(settings.workspace_root, Some(Utf8PathBuf::from("/from-flag")));
    assert_eq!(settings.progress, "quiet");
    assert_eq!(settings.retry.retries, 0);
    assert_eq!(settings.retry.attempts(), 1);
}

//! Log output for the `ciab-build` binary.
//!
//! The library logs through the `log` facade. The binary installs a
//! `tracing-subscriber` formatter on stderr, which picks those records up
//! through its `tracing-log` bridge. `RUST_LOG` overrides the level chosen
//! with `-v`/`-q`.

use log::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Target prefix shared by every record this crate emits.
const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Error returned when a global subscriber is already installed.
pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Filter directive enabling this crate's records up to `level`.
///
/// # Example
///
/// ```
/// use ciab_builder::logging::filter_directive;
/// use log::LevelFilter;
///
/// assert_eq!(filter_directive(LevelFilter::Warn), "ciab_builder=warn");
/// ```
#[must_use]
pub fn filter_directive(level: LevelFilter) -> String {
    format!("{CRATE_TARGET}={}", level.as_str().to_lowercase())
}

/// Builds the filter for `level`, deferring to `RUST_LOG` when it is set.
#[must_use]
pub fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(level)))
}

/// Install the stderr subscriber with `level` as the default filter.
///
/// # Errors
///
/// Returns an error if a global subscriber or `log` logger was already
/// installed.
pub fn init(level: LevelFilter) -> Result<(), InitError> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::quiet(LevelFilter::Warn, "ciab_builder=warn")]
    #[case::default(LevelFilter::Info, "ciab_builder=info")]
    #[case::verbose(LevelFilter::Debug, "ciab_builder=debug")]
    #[case::very_verbose(LevelFilter::Trace, "ciab_builder=trace")]
    fn directive_scopes_level_to_this_crate(#[case] level: LevelFilter, #[case] expected: &str) {
        let directive = filter_directive(level);
        assert_eq!(directive, expected);
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn rust_log_overrides_cli_level() {
        let filter = temp_env::with_var("RUST_LOG", Some("ciab_builder=trace"), || {
            env_filter(LevelFilter::Warn)
        });
        assert_eq!(filter.to_string(), "ciab_builder=trace");
    }

    #[test]
    fn cli_level_applies_without_rust_log() {
        let filter = temp_env::with_var_unset("RUST_LOG", || env_filter(LevelFilter::Debug));
        assert_eq!(filter.to_string(), "ciab_builder=debug");
    }
}

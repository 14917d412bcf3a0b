//! CDN-in-a-Box builder CLI entrypoint.
//!
//! This binary flattens and stages built packages, then runs the compose
//! build with retries. It is the only place that terminates the process.

use ciab_builder::cli::Cli;
use ciab_builder::config::Settings;
use ciab_builder::error::Result;
use ciab_builder::logging;
use ciab_builder::output::write_stderr_line;
use ciab_builder::pipeline::{PipelineContext, dry_run, run_pipeline};
use ciab_builder::routing::CIAB_ROUTES;
use ciab_builder::runner::{SystemCommandExecutor, ThreadSleeper};
use clap::Parser;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    if let Err(e) = logging::init(cli.log_level()) {
        write_stderr_line(&mut stderr, format!("failed to initialise logging: {e}"));
    }

    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let settings = Settings::from_env(cli)?;
    let context = PipelineContext {
        settings: &settings,
        rules: CIAB_ROUTES,
        skip_build: cli.skip_build,
        quiet: cli.quiet,
    };

    if cli.dry_run {
        return dry_run(&context, stderr);
    }

    run_pipeline(&context, &SystemCommandExecutor, &ThreadSleeper, stderr)?;
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            err.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use ciab_builder::error::BuilderError;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn missing_package_exits_with_one() {
        let err = BuilderError::MissingArtifact {
            description: "Traffic Router",
            pattern: "traffic_router",
            destination: Utf8PathBuf::from("/ciab/traffic_router/traffic_router.rpm"),
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.contains("missing required package Traffic Router"));
    }

    #[test]
    fn exhausted_build_propagates_child_status() {
        let err = BuilderError::RetriesExhausted {
            command: "docker compose build --parallel".to_owned(),
            attempts: 3,
            exit_code: 137,
        };

        let mut stderr = Vec::new();
        assert_eq!(exit_code_for_run_result(Err(err), &mut stderr), 137);
    }
}

//! Retrying execution of external commands.
//!
//! Commands run synchronously with the caller's standard streams. A failing
//! command is retried after a constant delay until the [`RetryPolicy`] runs
//! out, at which point the last exit code is returned to the caller inside
//! [`BuilderError::RetriesExhausted`].

use crate::error::{BuilderError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{error, info, warn};
use std::fmt;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

/// Retries allowed when none are configured.
pub const DEFAULT_RETRIES: u32 = 2;

/// Delay between attempts when none is configured.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(20);

/// Exit code used when a command fails to start or reports no status.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Description of a command to run.
///
/// The working directory and extra environment travel with the command
/// instead of being applied to this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    working_dir: Option<Utf8PathBuf>,
}

impl CommandSpec {
    /// Start describing an invocation of `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            working_dir: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child only.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Run the child in `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Environment variables set on the child.
    #[must_use]
    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Looks up a child environment variable by name.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Directory the child runs in, if not inherited.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.working_dir.as_deref()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs `command` to completion and returns its exit status.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised when the command cannot be started.
    fn execute(&self, command: &CommandSpec) -> std::io::Result<ExitStatus>;
}

/// Executes commands on the host with inherited standard streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &CommandSpec) -> std::io::Result<ExitStatus> {
        let mut cmd = Command::new(command.program());
        cmd.args(command.get_args())
            .envs(command.envs().iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(dir) = command.working_dir() {
            cmd.current_dir(dir.as_std_path());
        }

        cmd.status()
    }
}

/// Abstraction over waiting between attempts.
#[cfg_attr(test, mockall::automock)]
pub trait Sleeper {
    /// Blocks for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// How often and how patiently a failing command is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Constant delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with `retries` retries spaced `delay` apart.
    #[must_use]
    pub const fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Total attempts, including the first.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        u64::from(self.retries) + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

/// Outcome of a successful retried run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Attempt on which the command succeeded.
    pub attempts: u64,
}

/// Normalise an exit status to an exit code.
///
/// Statuses without a code, such as termination by a signal, count as
/// [`FAILURE_EXIT_CODE`].
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(FAILURE_EXIT_CODE)
}

/// Runs commands, retrying failures according to a [`RetryPolicy`].
pub struct Runner<'a> {
    executor: &'a dyn CommandExecutor,
    sleeper: &'a dyn Sleeper,
    policy: RetryPolicy,
}

impl<'a> Runner<'a> {
    /// Create a runner using the given executor, sleeper, and policy.
    #[must_use]
    pub fn new(
        executor: &'a dyn CommandExecutor,
        sleeper: &'a dyn Sleeper,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            executor,
            sleeper,
            policy,
        }
    }

    /// Run `command` once and return its normalised exit code.
    ///
    /// A command that cannot be started yields [`FAILURE_EXIT_CODE`].
    pub fn run_once(&self, command: &CommandSpec) -> i32 {
        info!("{command}");
        match self.executor.execute(command) {
            Ok(status) => exit_code(status),
            Err(e) => {
                error!("Child process {command} failed to start: {e}");
                FAILURE_EXIT_CODE
            }
        }
    }

    /// Run `command` until it succeeds or the policy is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::RetriesExhausted`] carrying the last exit code
    /// when every attempt fails.
    pub fn run(&self, command: &CommandSpec) -> Result<RunSummary> {
        let total = self.policy.attempts();
        let mut attempt = 1;

        loop {
            let code = self.run_once(command);
            if code == 0 {
                return Ok(RunSummary { attempts: attempt });
            }

            if attempt >= total {
                error!("Child process {command} exited with status code {code}!");
                return Err(BuilderError::RetriesExhausted {
                    command: command.to_string(),
                    attempts: attempt,
                    exit_code: code,
                });
            }

            warn!(
                "Command failed with exit code {code} (attempt {attempt}/{total}); retrying in {}s...",
                self.policy.delay.as_secs()
            );
            self.sleeper.sleep(self.policy.delay);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::exit_status;
    use mockall::Sequence;
    use rstest::rstest;

    const POLICY: RetryPolicy = RetryPolicy::new(2, Duration::from_secs(20));

    fn command() -> CommandSpec {
        CommandSpec::new("docker").args(["compose", "build", "--parallel"])
    }

    fn scripted_executor(codes: &[i32]) -> MockCommandExecutor {
        let mut executor = MockCommandExecutor::new();
        let mut sequence = Sequence::new();
        for &code in codes {
            executor
                .expect_execute()
                .withf(|cmd| cmd.program() == "docker")
                .times(1)
                .in_sequence(&mut sequence)
                .returning(move |_| Ok(exit_status(code)));
        }
        executor
    }

    fn sleeper_expecting(sleeps: usize) -> MockSleeper {
        let mut sleeper = MockSleeper::new();
        sleeper
            .expect_sleep()
            .withf(|d| *d == Duration::from_secs(20))
            .times(sleeps)
            .return_const(());
        sleeper
    }

    #[test]
    fn succeeds_after_two_failures() {
        let executor = scripted_executor(&[1, 1, 0]);
        let sleeper = sleeper_expecting(2);

        let summary = Runner::new(&executor, &sleeper, POLICY)
            .run(&command())
            .expect("expected success");

        assert_eq!(summary.attempts, 3);
    }

    #[test]
    fn exhausting_retries_reports_last_exit_code() {
        let executor = scripted_executor(&[1, 2, 17]);
        let sleeper = sleeper_expecting(2);

        let err = Runner::new(&executor, &sleeper, POLICY)
            .run(&command())
            .expect_err("expected exhaustion");

        assert!(matches!(
            err,
            BuilderError::RetriesExhausted { attempts: 3, exit_code: 17, .. }
        ));
        assert_eq!(err.exit_code(), 17);
    }

    #[test]
    fn first_success_does_not_sleep() {
        let executor = scripted_executor(&[0]);
        let sleeper = sleeper_expecting(0);

        let summary = Runner::new(&executor, &sleeper, POLICY)
            .run(&command())
            .expect("expected success");

        assert_eq!(summary.attempts, 1);
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let executor = scripted_executor(&[4]);
        let sleeper = sleeper_expecting(0);
        let policy = RetryPolicy::new(0, Duration::from_secs(20));

        let err = Runner::new(&executor, &sleeper, policy)
            .run(&command())
            .expect_err("expected failure");

        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn start_failure_counts_as_exit_code_one_and_is_retried() {
        let mut executor = MockCommandExecutor::new();
        let mut sequence = Sequence::new();
        executor
            .expect_execute()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Err(std::io::Error::from(std::io::ErrorKind::NotFound)));
        executor
            .expect_execute()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(exit_status(0)));
        let sleeper = sleeper_expecting(1);

        let runner = Runner::new(&executor, &sleeper, POLICY);
        let summary = runner.run(&command()).expect("expected success");

        assert_eq!(summary.attempts, 2);
    }

    #[test]
    fn start_failure_exhaustion_exits_with_one() {
        let mut executor = MockCommandExecutor::new();
        executor
            .expect_execute()
            .times(3)
            .returning(|_| Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied)));
        let sleeper = sleeper_expecting(2);

        let err = Runner::new(&executor, &sleeper, POLICY)
            .run(&command())
            .expect_err("expected exhaustion");

        assert_eq!(err.exit_code(), FAILURE_EXIT_CODE);
    }

    #[cfg(unix)]
    #[test]
    fn signal_termination_normalises_to_one() {
        use std::os::unix::process::ExitStatusExt;

        // Raw wait status 9: terminated by SIGKILL, no exit code.
        assert_eq!(exit_code(ExitStatus::from_raw(9)), FAILURE_EXIT_CODE);
    }

    #[rstest]
    #[case::default_policy(RetryPolicy::default(), 3)]
    #[case::no_retries(RetryPolicy::new(0, DEFAULT_RETRY_DELAY), 1)]
    #[case::max_retries(RetryPolicy::new(u32::MAX, DEFAULT_RETRY_DELAY), 4_294_967_296)]
    fn attempts_include_first_run(#[case] policy: RetryPolicy, #[case] expected: u64) {
        assert_eq!(policy.attempts(), expected);
    }

    #[test]
    fn command_display_joins_program_and_arguments() {
        let cmd = command().env("DOCKER_BUILDKIT", "1").current_dir("/ciab");
        assert_eq!(cmd.to_string(), "docker compose build --parallel");
        assert_eq!(cmd.env_value("DOCKER_BUILDKIT"), Some("1"));
        assert_eq!(cmd.working_dir(), Some(Utf8Path::new("/ciab")));
    }
}

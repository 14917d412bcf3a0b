//! Shared test utilities for the builder crate.

use crate::runner::{CommandExecutor, CommandSpec, Sleeper};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::ExitStatus;
use std::time::Duration;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// A `CommandExecutor` that replays scripted results.
///
/// Each call consumes the next scripted result and records the command. Once
/// the script runs out every further call fails to start.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    script: RefCell<VecDeque<std::io::Result<i32>>>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl ScriptedExecutor {
    /// Replays `codes` as exit codes, one per call.
    #[must_use]
    pub fn with_exit_codes(codes: &[i32]) -> Self {
        Self::with_results(codes.iter().copied().map(Ok).collect())
    }

    /// Replays `results`; an `Err` simulates a command that fails to start.
    #[must_use]
    pub fn with_results(results: Vec<std::io::Result<i32>>) -> Self {
        Self {
            script: RefCell::new(results.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Commands executed so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Number of commands executed so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(&self, command: &CommandSpec) -> std::io::Result<ExitStatus> {
        self.calls.borrow_mut().push(command.clone());
        let next = self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(std::io::Error::other("no scripted result left")));
        next.map(exit_status)
    }
}

/// A `Sleeper` that records requested delays instead of blocking.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Delays requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

//! CDN-in-a-Box builder library.
//!
//! This crate stages freshly built packages into the layout the CDN-in-a-Box
//! compose files expect and drives `docker compose build` with bounded
//! retries. It is used by the `ciab-build` CLI binary and can be consumed
//! programmatically for testing.
//!
//! # Modules
//!
//! - [`artifact`] - Package discovery and flattening of the artifact root
//! - [`cli`] - Command-line argument definitions
//! - [`compose`] - `docker compose build` command construction
//! - [`config`] - Settings resolved from flags and environment variables
//! - [`error`] - Error types and exit code mapping
//! - [`logging`] - `tracing-subscriber` setup for the binary
//! - [`output`] - Summaries and dry-run reports
//! - [`pipeline`] - Stage-then-build orchestration
//! - [`routing`] - Routing table from package names to compose destinations
//! - [`runner`] - Retrying command execution
//! - [`stager`] - Copying routed packages into the compose tree

pub mod artifact;
pub mod cli;
pub mod compose;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod routing;
pub mod runner;
pub mod stager;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

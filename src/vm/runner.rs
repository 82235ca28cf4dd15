//! External process execution.
//!
//! Every external call produces a [`ToolOutcome`] instead of a bare error so
//! the dispatcher can tell "not installed" from "ran and failed".
//!
//! ```text
//! ToolCommand ─► ProcessRunner::run ─► ToolOutcome
//!                   ├─ TokioRunner   (tokio::process, inherited stdio)
//!                   └─ DryRunRunner  (prints the command line)
//! ```

use std::fmt;
use std::io;
use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{debug, info};

use crate::vm::ToolCommand;

/// How an external command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Exited with status 0.
    Success,
    /// The program could not be found.
    NotFound,
    /// Exited with a non-zero code.
    ExitCode(i32),
    /// Ended without an exit code (killed by a signal).
    Terminated,
    /// Any other spawn or wait failure.
    SpawnFailed(String),
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success)
    }

    /// Classify the result of waiting on a child process.
    pub fn from_status(status: io::Result<ExitStatus>) -> Self {
        match status {
            Ok(s) if s.success() => ToolOutcome::Success,
            Ok(s) => match s.code() {
                Some(code) => ToolOutcome::ExitCode(code),
                None => ToolOutcome::Terminated,
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => ToolOutcome::NotFound,
            Err(e) => ToolOutcome::SpawnFailed(e.to_string()),
        }
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutcome::Success => f.write_str("succeeded"),
            ToolOutcome::NotFound => f.write_str("was not found; is QEMU installed and on PATH?"),
            ToolOutcome::ExitCode(code) => write!(f, "exited with code {code}"),
            ToolOutcome::Terminated => f.write_str("was terminated by a signal"),
            ToolOutcome::SpawnFailed(reason) => write!(f, "failed to start: {reason}"),
        }
    }
}

/// Runs external commands to completion.
#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
    /// Run `command` and wait for it to exit.
    async fn run(&self, command: &ToolCommand) -> ToolOutcome;

    /// `true` when commands are only reported, never executed. Host-side
    /// preparation such as creating directories is skipped as well.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Spawns real child processes with `tokio::process`.
///
/// stdio is inherited so the emulator's own diagnostics reach the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRunner;

impl ProcessRunner for TokioRunner {
    async fn run(&self, command: &ToolCommand) -> ToolOutcome {
        info!(program = %command.program, args = ?command.args, "running external command");

        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .await;
        let outcome = ToolOutcome::from_status(status);

        debug!(program = %command.program, %outcome, "external command finished");
        outcome
    }
}

/// Prints each command line to stdout and reports success without running it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl ProcessRunner for DryRunRunner {
    async fn run(&self, command: &ToolCommand) -> ToolOutcome {
        println!("{command}");
        ToolOutcome::Success
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

// crates/modvet-dispatch/src/runner.rs
// ============================================================================
// Module: Command Runner
// Description: Seam between dispatch workers and external processes.
// Purpose: Run one validator invocation to completion.
// Dependencies: async-trait, tokio
// ============================================================================

//! ## Overview
//! Workers hand each argument vector to a [`CommandRunner`] and wait for the
//! outcome. [`ProcessRunner`] spawns the real program with null stdio. There
//! is no timeout: a process that never exits holds its worker forever.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Terminal state of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process ran and exited; `None` when killed by a signal or the
    /// wait itself failed.
    Completed {
        /// Process exit code.
        exit_code: Option<i32>,
    },
    /// The process could not be started.
    SpawnFailed {
        /// Spawn error description.
        error: String,
    },
}

/// Executes validator argument vectors.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `args` (program first) and waits for it to finish.
    async fn run(&self, args: &[String]) -> RunOutcome;
}

/// Runner that spawns real operating-system processes.
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, args: &[String]) -> RunOutcome {
        let Some((program, rest)) = args.split_first() else {
            return RunOutcome::SpawnFailed {
                error: "empty argument vector".to_string(),
            };
        };
        let spawned = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                return RunOutcome::SpawnFailed {
                    error: err.to_string(),
                };
            }
        };
        match child.wait().await {
            Ok(status) => RunOutcome::Completed {
                exit_code: status.code(),
            },
            Err(_) => RunOutcome::Completed {
                exit_code: None,
            },
        }
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Command runners
//!
//! The engine never interprets what a command does; it hands a rendered
//! command to an injected `CommandRunner` and records the outcome. Concrete
//! backends (shell processes, containerized builders, remote APIs) implement
//! the trait.

mod shell;

pub use shell::ShellRunner;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::RunflowError;

/// Everything a runner needs to invoke one command
///
/// Assembled explicitly by the caller; the core never reads ambient process
/// state (environment variables, current directory) on its own.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Working directory for the command
    pub working_dir: PathBuf,

    /// Full environment for the command (global env, step env, caller env)
    pub env: HashMap<String, String>,
}

/// Outcome of invoking one command
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Process exit code
    pub exit_code: i32,

    /// Outputs the command emitted (name → value)
    pub outputs: HashMap<String, String>,

    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Wall-clock duration
    pub duration: Duration,
}

impl CommandOutcome {
    /// Whether the command exited zero
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability for executing a step's rendered command
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Execute a rendered command and report its outcome
    ///
    /// A non-zero exit is an `Ok` outcome, not an error; `Err` means the
    /// command could not be invoked at all.
    async fn execute(
        &self,
        step_name: &str,
        command: &str,
        context: &CommandContext,
    ) -> Result<CommandOutcome, RunflowError>;
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Shell command runner
//!
//! Spawns `<shell> -c <command>` with an explicit environment and working
//! directory, and captures step outputs from stdout lines of the form
//! `name=value`.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

use super::{CommandContext, CommandOutcome, CommandRunner};
use crate::errors::RunflowError;

/// Runner backed by a local shell
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    /// Create a runner using the given shell (e.g. "bash", "sh")
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("bash")
    }
}

fn output_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_-]*)=(.*)$").expect("valid regex"))
}

/// Parse `name=value` output lines from stdout
fn parse_outputs(stdout: &str) -> HashMap<String, String> {
    let mut outputs = HashMap::new();
    for line in stdout.lines() {
        if let Some(cap) = output_line_regex().captures(line.trim_end()) {
            outputs.insert(cap[1].to_string(), cap[2].to_string());
        }
    }
    outputs
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn execute(
        &self,
        step_name: &str,
        command: &str,
        context: &CommandContext,
    ) -> Result<CommandOutcome, RunflowError> {
        debug!(step = step_name, shell = %self.shell, "spawning command");

        let start = Instant::now();

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command);
        cmd.current_dir(&context.working_dir);
        cmd.env_clear();
        cmd.envs(&context.env);

        let output = cmd.output().await.map_err(|e| RunflowError::RunnerError {
            step: step_name.to_string(),
            error: e.to_string(),
            help: Some(format!("Shell '{}' may not be available", self.shell)),
        })?;

        let duration = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        debug!(
            step = step_name,
            exit_code,
            secs = duration.as_secs_f64(),
            "command finished"
        );

        let outputs = if output.status.success() {
            parse_outputs(&stdout)
        } else {
            HashMap::new()
        };

        Ok(CommandOutcome {
            exit_code,
            outputs,
            stdout,
            stderr,
            duration,
        })
    }
}

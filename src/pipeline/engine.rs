// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Pipeline execution engine
//!
//! Walks the step graph sequentially in declaration order, evaluating
//! conditions, short-circuiting dependents of skipped or failed steps, and
//! recording every outcome in the per-run execution state. The engine never
//! terminates the process; every failure comes back as part of the result.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::errors::RunflowError;
use crate::pipeline::state::{ExecutionState, RunResult, RunStatus, StepStatus};
use crate::pipeline::{
    outputs, template, validate_inputs, PipelineDefinition, StepGraph, StepSpec,
};
use crate::runner::{CommandContext, CommandRunner};

/// Per-run options, assembled explicitly by the caller
///
/// The engine reads no ambient process state; working directory and base
/// environment arrive here.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Working directory for every command
    pub working_dir: PathBuf,

    /// Base environment; pipeline and step env entries override it
    pub env: HashMap<String, String>,
}

/// Pipeline execution engine
pub struct Engine {
    runner: Box<dyn CommandRunner>,
}

impl Engine {
    /// Create an engine around a command runner capability
    pub fn new(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Execute a pipeline against raw inputs
    ///
    /// Inputs are validated and the step graph built before any command
    /// runs; callers wanting the full definition lint run
    /// `PipelineValidator` beforehand. Execution problems never error here:
    /// step failures and missing required outputs come back in the result's
    /// status, alongside the complete per-step state.
    pub async fn run(
        &self,
        pipeline: &PipelineDefinition,
        raw_inputs: &HashMap<String, String>,
        options: &RunOptions,
    ) -> Result<RunResult, RunflowError> {
        let start = Instant::now();

        let inputs = validate_inputs(&pipeline.inputs, raw_inputs)?;
        let graph = StepGraph::build(pipeline)?;

        let mut state = ExecutionState::new(pipeline);
        let mut first_failure: Option<(String, Option<i32>)> = None;

        info!(pipeline = %pipeline.name, steps = pipeline.steps.len(), "starting run");

        for idx in graph.execution_order() {
            let step = &pipeline.steps[idx];

            if let Some(blocker) = self.blocked_by(step, &graph, &state) {
                debug!(step = %step.name, blocker = %blocker, "short-circuited to skipped");
                state.set_status(&step.name, StepStatus::Skipped);
                continue;
            }

            if !step.condition.evaluate(&step.name, &inputs, &state)? {
                debug!(step = %step.name, "condition false, skipping");
                state.set_status(&step.name, StepStatus::Skipped);
                continue;
            }

            state.set_status(&step.name, StepStatus::Running);

            let command = match template::render(&step.name, &step.run, &inputs, &state) {
                Ok(command) => command,
                Err(e) => {
                    warn!(step = %step.name, error = %e, "template rendering failed");
                    self.record_invocation_failure(&mut state, &step.name, e);
                    if first_failure.is_none() {
                        first_failure = Some((step.name.clone(), None));
                    }
                    continue;
                }
            };

            let context = self.command_context(pipeline, step, options);

            debug!(step = %step.name, command = %command, "executing");

            let outcome = match self.runner.execute(&step.name, &command, &context).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(step = %step.name, error = %e, "command could not be invoked");
                    self.record_invocation_failure(&mut state, &step.name, e);
                    if first_failure.is_none() {
                        first_failure = Some((step.name.clone(), None));
                    }
                    continue;
                }
            };

            let record = state
                .record_mut(&step.name)
                .expect("state holds every step");
            record.exit_code = Some(outcome.exit_code);
            record.stdout = outcome.stdout;
            record.stderr = outcome.stderr;
            record.duration = Some(outcome.duration);

            if outcome.exit_code == 0 {
                for name in &step.outputs {
                    match outcome.outputs.get(name) {
                        Some(value) => {
                            record.outputs.insert(name.clone(), value.clone());
                        }
                        None => {
                            debug!(step = %step.name, output = %name, "declared output not emitted");
                        }
                    }
                }
                record.status = StepStatus::Succeeded;
                info!(step = %step.name, "succeeded");
            } else {
                record.status = StepStatus::Failed;
                warn!(step = %step.name, exit_code = outcome.exit_code, "failed");
                if first_failure.is_none() {
                    first_failure = Some((step.name.clone(), Some(outcome.exit_code)));
                }
            }
        }

        let (status, resolved) = match first_failure {
            None => match outputs::aggregate(pipeline, &state) {
                Ok(resolved) => (RunStatus::Succeeded, resolved),
                Err(RunflowError::MissingOutput { output, step }) => {
                    warn!(output = %output, step = %step, "required output never produced");
                    let resolved = outputs::aggregate_partial(pipeline, &state);
                    (RunStatus::MissingOutput { output, step }, resolved)
                }
                Err(e) => return Err(e),
            },
            Some((step, exit_code)) => {
                // the step failure is the run's reason; outputs best-effort
                let resolved = outputs::aggregate_partial(pipeline, &state);
                (RunStatus::Failed { step, exit_code }, resolved)
            }
        };

        Ok(RunResult {
            pipeline: pipeline.name.clone(),
            status,
            state,
            outputs: resolved,
            duration: start.elapsed(),
        })
    }

    /// Find a dependency whose terminal state short-circuits this step
    ///
    /// A dependency in Skipped or Failed state blocks the step unless the
    /// step's condition explicitly names that dependency's failure, in which
    /// case the condition decides.
    fn blocked_by(
        &self,
        step: &StepSpec,
        graph: &StepGraph,
        state: &ExecutionState,
    ) -> Option<String> {
        for dep in graph.dependencies(&step.name).unwrap_or_default() {
            let Some(record) = state.record(&dep) else {
                continue;
            };
            let terminal_miss = matches!(record.status, StepStatus::Skipped | StepStatus::Failed);
            if terminal_miss && !step.condition.tolerates_failure_of(&dep) {
                return Some(dep);
            }
        }
        None
    }

    /// Record a step that failed before its command could complete
    fn record_invocation_failure(
        &self,
        state: &mut ExecutionState,
        step_name: &str,
        error: RunflowError,
    ) {
        if let Some(record) = state.record_mut(step_name) {
            record.status = StepStatus::Failed;
            record.stderr = error.to_string();
        }
    }

    /// Assemble the explicit environment for one command
    fn command_context(
        &self,
        pipeline: &PipelineDefinition,
        step: &StepSpec,
        options: &RunOptions,
    ) -> CommandContext {
        let mut env = options.env.clone();
        env.extend(pipeline.env.clone());
        env.extend(step.env.clone());

        CommandContext {
            working_dir: options.working_dir.clone(),
            env,
        }
    }
}

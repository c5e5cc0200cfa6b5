// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Error types for runflow
//!
//! Every failure mode is a structured variant: definition problems are caught
//! before any step runs, execution problems are recorded per step, and the
//! engine itself never terminates the process.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for runflow operations
pub type RunflowResult<T> = Result<T, RunflowError>;

/// Main error type for runflow
#[derive(Error, Debug, Diagnostic)]
pub enum RunflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Input Validation Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("input validation failed:\n{}", problems.iter().map(|p| format!("  - {p}")).collect::<Vec<_>>().join("\n"))]
    #[diagnostic(
        code(runflow::invalid_inputs),
        help("Fix every listed input and re-run; all problems are reported at once")
    )]
    InvalidInputs { problems: Vec<String> },

    // ─────────────────────────────────────────────────────────────────────────
    // Definition Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline file not found: {path}")]
    #[diagnostic(code(runflow::pipeline_not_found))]
    PipelineNotFound { path: PathBuf },

    #[error("Invalid pipeline definition: {reason}")]
    #[diagnostic(code(runflow::invalid_pipeline))]
    InvalidPipeline {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Duplicate step name: '{step}'")]
    #[diagnostic(
        code(runflow::duplicate_step),
        help("Step names must be unique within a pipeline")
    )]
    DuplicateStep { step: String },

    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    #[diagnostic(
        code(runflow::unknown_dependency),
        help("Check that '{dependency}' is defined in your pipeline")
    )]
    UnknownDependency { step: String, dependency: String },

    #[error("Step '{step}' references later-declared step '{dependency}'")]
    #[diagnostic(
        code(runflow::forward_reference),
        help("Dependencies must point at steps declared earlier in the sequence; reorder your steps")
    )]
    ForwardReference { step: String, dependency: String },

    #[error("Circular dependency detected")]
    #[diagnostic(
        code(runflow::circular_dependency),
        help("Review your step dependencies to remove the cycle")
    )]
    CircularDependency { steps: Vec<String> },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step '{step}' failed{}", exit_code.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
    #[diagnostic(code(runflow::step_failed))]
    StepFailed {
        step: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Command runner error in step '{step}': {error}")]
    #[diagnostic(code(runflow::runner_error))]
    RunnerError {
        step: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("Cannot resolve '{reference}' in step '{step}'")]
    #[diagnostic(
        code(runflow::template_reference),
        help("Templates may reference 'inputs.NAME' or 'steps.STEP.outputs.NAME' for earlier steps")
    )]
    TemplateReference { step: String, reference: String },

    #[error("Condition for step '{step}' references unknown {kind} '{name}'")]
    #[diagnostic(code(runflow::condition_reference))]
    ConditionReference {
        step: String,
        kind: String,
        name: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Aggregation Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Required output '{output}' was never produced by step '{step}'")]
    #[diagnostic(
        code(runflow::missing_output),
        help("The producing step was skipped, failed, or did not emit the declared output")
    )]
    MissingOutput { output: String, step: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/Parse Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(runflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(runflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(runflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(runflow::json_error))]
    Json { message: String },
}

impl From<std::io::Error> for RunflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RunflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for RunflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json {
            message: e.to_string(),
        }
    }
}

impl RunflowError {
    /// Exit code the CLI maps this error to.
    ///
    /// Definition and input problems exit 1; anything arising from executing
    /// the pipeline (a failed step, a required output that never
    /// materialized) exits 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StepFailed { .. } | Self::RunnerError { .. } | Self::MissingOutput { .. } => 2,
            _ => 1,
        }
    }
}

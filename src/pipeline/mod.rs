// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Pipeline definitions and execution
//!
//! This module defines the core data structures and machinery for runflow
//! pipelines: definitions, conditions, the step graph, input validation,
//! the execution engine, and output aggregation.

mod condition;
mod dag;
mod definition;
mod engine;
pub mod outputs;
mod state;
pub mod template;
mod validation;

pub use condition::Condition;
pub use dag::StepGraph;
pub use definition::{InputSpec, InputType, OutputSpec, PipelineDefinition, StepSpec, Value};
pub use engine::{Engine, RunOptions};
pub use state::{ExecutionState, RunResult, RunStatus, StepRecord, StepStatus};
pub use validation::{validate_inputs, PipelineValidator, ValidationResult};

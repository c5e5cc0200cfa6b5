// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! # runflow - CI Pipeline Dispatch Engine
//!
//! `runflow` executes declarative CI pipelines: typed inputs, a step
//! dependency DAG, conditional execution, and aggregated outputs.
//!
//! ## Features
//!
//! - **Typed inputs** - string, bool, and enum inputs with defaults,
//!   validated before anything runs
//! - **Step DAG** - `needs`-driven dependency graph, acyclic by construction
//! - **Conditional steps** - run conditions over inputs and prior step
//!   outputs, including explicit run-on-failure handlers
//! - **Pluggable runners** - commands execute through an injected
//!   capability; a shell runner ships in the box
//!
//! ## Quick Start
//!
//! ```bash
//! # Validate a pipeline definition
//! runflow validate release.yaml
//!
//! # Run it
//! runflow run release.yaml --input version=1.2.3
//!
//! # Inspect the step graph
//! runflow graph release.yaml --format mermaid
//! ```

pub mod cli;
pub mod errors;
pub mod pipeline;
pub mod runner;

// Re-export commonly used types
pub use errors::{RunflowError, RunflowResult};
pub use pipeline::{Engine, PipelineDefinition, RunOptions, RunResult, StepSpec};
pub use runner::{CommandContext, CommandOutcome, CommandRunner, ShellRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for runflow.

pub mod graph;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CI pipeline dispatch engine
///
/// Execute declarative pipelines of conditional, dependency-ordered steps.
#[derive(Parser, Debug)]
#[clap(
    name = "runflow",
    version,
    about = "CI pipeline dispatch engine",
    long_about = None,
    after_help = "Examples:\n\
        runflow validate release.yaml             Check a pipeline definition\n\
        runflow run release.yaml --input v=1.2.3  Execute the pipeline\n\
        runflow graph release.yaml --format dot   Render the step DAG\n\n\
        Exit codes: 0 success, 1 validation error, 2 step execution failure.\n\
        See 'runflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a pipeline
    ///
    /// Aggregated outputs are written to stdout as key=value lines; the
    /// per-step report goes to stderr.
    Run {
        /// Pipeline file
        #[clap(default_value = ".runflow.yaml")]
        pipeline: PathBuf,

        /// Pipeline inputs as key=value (repeatable)
        #[clap(short, long, value_name = "KEY=VALUE")]
        input: Vec<String>,

        /// Show the execution plan without running anything
        #[clap(long)]
        dry_run: bool,
    },

    /// Validate a pipeline definition
    Validate {
        /// Pipeline file to validate
        #[clap(default_value = ".runflow.yaml")]
        pipeline: PathBuf,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a pipeline's step graph
    Graph {
        /// Pipeline file
        #[clap(default_value = ".runflow.yaml")]
        pipeline: PathBuf,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },
}

/// Output format for the validate command
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[clap(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

/// Graph output format
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[clap(rename_all = "lowercase")]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

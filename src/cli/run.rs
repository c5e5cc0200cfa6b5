// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Run command - execute a pipeline
//!
//! Stdout carries only the aggregated outputs as key=value lines; the
//! per-step report is written to stderr.

use colored::Colorize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::errors::RunflowError;
use crate::pipeline::{
    Engine, PipelineDefinition, PipelineValidator, RunOptions, RunResult, RunStatus, StepGraph,
    StepStatus,
};
use crate::runner::ShellRunner;

/// Run the pipeline
pub async fn run(
    pipeline_path: PathBuf,
    inputs: Vec<String>,
    dry_run: bool,
    verbose: bool,
) -> Result<(), RunflowError> {
    if !pipeline_path.exists() {
        return Err(RunflowError::PipelineNotFound {
            path: pipeline_path,
        });
    }

    let raw_inputs = parse_inputs(&inputs)?;
    let pipeline = PipelineDefinition::from_file(&pipeline_path)?;

    let validation = PipelineValidator::validate(&pipeline);

    if !validation.is_valid() {
        eprintln!("{}", "Pipeline validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return validation.into_error();
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    if dry_run {
        let graph = StepGraph::build(&pipeline)?;
        eprintln!("{}: {}", "Pipeline".bold(), pipeline.name);
        eprintln!("{}", "═".repeat(50));
        eprintln!("Execution plan:");
        eprintln!();
        eprint!("{}", graph.to_text(&pipeline));
        return Ok(());
    }

    let working_dir = std::env::current_dir()?;
    let options = RunOptions {
        working_dir,
        env: std::env::vars().collect(),
    };

    let engine = Engine::new(Box::new(ShellRunner::default()));
    let result = engine.run(&pipeline, &raw_inputs, &options).await?;

    print_report(&result, verbose);

    // aggregated outputs are the only stdout
    for (name, value) in &result.outputs {
        println!("{}={}", name, value);
    }

    match result.status {
        RunStatus::Succeeded => Ok(()),
        RunStatus::Failed { step, exit_code } => {
            let stderr = result
                .state
                .record(&step)
                .map(|r| r.stderr.clone())
                .unwrap_or_default();
            Err(RunflowError::StepFailed {
                step,
                exit_code,
                stderr,
            })
        }
        RunStatus::MissingOutput { output, step } => {
            Err(RunflowError::MissingOutput { output, step })
        }
    }
}

/// Parse repeated `--input key=value` arguments
fn parse_inputs(inputs: &[String]) -> Result<HashMap<String, String>, RunflowError> {
    let mut raw = HashMap::new();
    let mut problems = Vec::new();

    for entry in inputs {
        match entry.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                raw.insert(key.to_string(), value.to_string());
            }
            _ => problems.push(format!("input '{entry}' is not of the form key=value")),
        }
    }

    if problems.is_empty() {
        Ok(raw)
    } else {
        Err(RunflowError::InvalidInputs { problems })
    }
}

/// Print the per-step report to stderr
fn print_report(result: &RunResult, verbose: bool) {
    eprintln!();
    eprintln!("{}: {}", "Pipeline".bold(), result.pipeline);
    eprintln!("{}", "═".repeat(50));

    for (name, record) in result.state.iter() {
        let line = match record.status {
            StepStatus::Succeeded => format!(
                "  {} {} ({:.2}s)",
                "✓".green(),
                name.bold(),
                record.duration.unwrap_or_default().as_secs_f64()
            ),
            StepStatus::Failed => match record.exit_code {
                Some(code) => format!("  {} {} (exit {})", "✗".red(), name.bold(), code),
                None => format!("  {} {} (not invoked)", "✗".red(), name.bold()),
            },
            StepStatus::Skipped => format!("  {} {} {}", "-".dimmed(), name, "skipped".dimmed()),
            StepStatus::Pending | StepStatus::Running => {
                format!("  {} {} {}", "?".yellow(), name, record.status)
            }
        };
        eprintln!("{}", line);

        if verbose && record.status == StepStatus::Failed && !record.stderr.is_empty() {
            eprintln!("{}", record.stderr.dimmed());
        }
    }

    eprintln!();
    if result.success() {
        eprintln!(
            "{}",
            format!(
                "Pipeline completed successfully in {:.2}s",
                result.duration.as_secs_f64()
            )
            .green()
        );
    } else {
        eprintln!(
            "{}",
            format!("Pipeline failed after {:.2}s", result.duration.as_secs_f64()).red()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inputs() {
        let raw = parse_inputs(&["version=1.2.3".into(), "url=https://x?a=1".into()]).unwrap();
        assert_eq!(raw["version"], "1.2.3");
        // value keeps everything after the first '='
        assert_eq!(raw["url"], "https://x?a=1");
    }

    #[test]
    fn test_parse_inputs_rejects_malformed() {
        let err = parse_inputs(&["noequals".into(), "=value".into()]).unwrap_err();
        let RunflowError::InvalidInputs { problems } = err else {
            panic!("expected InvalidInputs");
        };
        assert_eq!(problems.len(), 2);
    }
}

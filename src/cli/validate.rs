// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Validate command - check a pipeline definition

use colored::Colorize;
use std::path::PathBuf;

use super::OutputFormat;
use crate::errors::RunflowError;
use crate::pipeline::{PipelineDefinition, PipelineValidator};

/// Run the validate command
pub async fn run(
    pipeline_path: PathBuf,
    format: OutputFormat,
    verbose: bool,
) -> Result<(), RunflowError> {
    if !pipeline_path.exists() {
        return Err(RunflowError::PipelineNotFound {
            path: pipeline_path,
        });
    }

    let pipeline = PipelineDefinition::from_file(&pipeline_path)?;
    let validation = PipelineValidator::validate(&pipeline);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&validation)?);
        return validation.into_error();
    }

    println!("{}", "Validating pipeline...".bold());
    println!();
    println!("  {} Pipeline file is valid YAML", "✓".green());

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        println!("  Name: {}", pipeline.name);
        println!("  Inputs: {}", pipeline.inputs.len());
        println!("  Outputs: {}", pipeline.outputs.len());
        println!("  Steps: {}", pipeline.steps.len());
        for step in &pipeline.steps {
            let needs = if step.needs.is_empty() {
                String::new()
            } else {
                format!(" [needs: {}]", step.needs.join(", "))
            };
            println!("    - {}{}", step.name, needs.dimmed());
        }
    }

    println!();

    if validation.is_valid() {
        if validation.has_warnings() {
            println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
        } else {
            println!("{}", "Pipeline is valid!".green().bold());
        }
        Ok(())
    } else {
        validation.into_error()
    }
}

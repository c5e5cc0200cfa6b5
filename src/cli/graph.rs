// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Graph command - visualize a pipeline's step DAG

use std::path::PathBuf;

use super::GraphFormat;
use crate::errors::RunflowError;
use crate::pipeline::{PipelineDefinition, StepGraph};

/// Run the graph command
pub async fn run(
    pipeline_path: PathBuf,
    format: GraphFormat,
    _verbose: bool,
) -> Result<(), RunflowError> {
    if !pipeline_path.exists() {
        return Err(RunflowError::PipelineNotFound {
            path: pipeline_path,
        });
    }

    let pipeline = PipelineDefinition::from_file(&pipeline_path)?;
    let graph = StepGraph::build(&pipeline)?;

    let output = match format {
        GraphFormat::Text => graph.to_text(&pipeline),
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}

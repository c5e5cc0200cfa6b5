// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Output aggregation
//!
//! Collects declared pipeline outputs from the final execution state into a
//! flat namespace. Outputs from skipped or failed producers are simply
//! absent, unless declared required.

use std::collections::BTreeMap;

use crate::errors::RunflowError;
use crate::pipeline::state::{ExecutionState, StepStatus};
use crate::pipeline::PipelineDefinition;

/// Resolve declared outputs from the final execution state
///
/// Fails with a missing-output error only for outputs marked required.
pub fn aggregate(
    pipeline: &PipelineDefinition,
    state: &ExecutionState,
) -> Result<BTreeMap<String, String>, RunflowError> {
    collect(pipeline, state, true)
}

/// Best-effort aggregation that ignores required flags
///
/// Used when the run already failed and the step failure is the surfaced
/// reason.
pub fn aggregate_partial(
    pipeline: &PipelineDefinition,
    state: &ExecutionState,
) -> BTreeMap<String, String> {
    collect(pipeline, state, false).expect("cannot fail without required enforcement")
}

fn collect(
    pipeline: &PipelineDefinition,
    state: &ExecutionState,
    enforce_required: bool,
) -> Result<BTreeMap<String, String>, RunflowError> {
    let mut resolved = BTreeMap::new();

    for (name, spec) in &pipeline.outputs {
        let source = spec.source_name(name);

        let value = state
            .record(&spec.step)
            .filter(|r| r.status == StepStatus::Succeeded)
            .and_then(|r| r.outputs.get(source));

        match value {
            Some(value) => {
                resolved.insert(name.clone(), value.clone());
            }
            None if spec.required && enforce_required => {
                return Err(RunflowError::MissingOutput {
                    output: name.clone(),
                    step: spec.step.clone(),
                });
            }
            None => {}
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(required: bool) -> PipelineDefinition {
        let yaml = format!(
            r#"
name: "agg"
outputs:
  artifact:
    step: build
    output: artifact_path
    required: {required}
  report:
    step: scan
steps:
  - name: "build"
    run: "make build"
    outputs: [artifact_path]
  - name: "scan"
    needs: [build]
    run: "make scan"
    outputs: [report]
"#
        );
        PipelineDefinition::from_yaml(&yaml).unwrap()
    }

    fn state(build: StepStatus, scan: StepStatus) -> ExecutionState {
        let mut state = ExecutionState::empty();
        state.insert_pending("build");
        state.insert_pending("scan");
        state.set_status("build", build);
        state.set_status("scan", scan);
        if build == StepStatus::Succeeded {
            state.record_output("build", "artifact_path", "dist/app.tar.gz");
        }
        if scan == StepStatus::Succeeded {
            state.record_output("scan", "report", "scan.json");
        }
        state
    }

    #[test]
    fn test_all_succeeded_yields_all_declared_outputs() {
        let outputs = aggregate(
            &pipeline(true),
            &state(StepStatus::Succeeded, StepStatus::Succeeded),
        )
        .unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs["artifact"], "dist/app.tar.gz");
        assert_eq!(outputs["report"], "scan.json");
    }

    #[test]
    fn test_skipped_producer_is_absent_not_error() {
        let outputs = aggregate(
            &pipeline(false),
            &state(StepStatus::Succeeded, StepStatus::Skipped),
        )
        .unwrap();

        assert_eq!(outputs.len(), 1);
        assert!(!outputs.contains_key("report"));
    }

    #[test]
    fn test_failed_producer_never_contributes() {
        let outputs = aggregate(
            &pipeline(false),
            &state(StepStatus::Failed, StepStatus::Skipped),
        )
        .unwrap();

        assert!(outputs.is_empty());
    }

    #[test]
    fn test_required_output_missing_is_error() {
        let err = aggregate(
            &pipeline(true),
            &state(StepStatus::Failed, StepStatus::Skipped),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            RunflowError::MissingOutput { ref output, .. } if output == "artifact"
        ));
    }

    #[test]
    fn test_partial_aggregation_ignores_required() {
        let outputs = aggregate_partial(
            &pipeline(true),
            &state(StepStatus::Failed, StepStatus::Succeeded),
        );

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs["report"], "scan.json");
    }

    #[test]
    fn test_undeclared_emitted_outputs_are_ignored() {
        let mut s = state(StepStatus::Succeeded, StepStatus::Succeeded);
        s.record_output("build", "stray", "value");

        let outputs = aggregate(&pipeline(false), &s).unwrap();
        assert!(!outputs.contains_key("stray"));
    }
}

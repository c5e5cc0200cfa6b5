// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Input and pipeline validation
//!
//! Input validation is a pure function from raw key=value pairs to typed
//! values; it reports every offending field at once. Pipeline validation
//! checks the definition before any execution.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::errors::RunflowError;
use crate::pipeline::template::{self, TemplateRef};
use crate::pipeline::{InputSpec, InputType, PipelineDefinition, StepGraph, StepSpec, Value};

/// Validate raw inputs against the pipeline's declared input specs
///
/// Returns a typed mapping covering every declared input, or an error
/// listing all problems. Absent optional inputs resolve to their
/// type-appropriate empty value (false for bool, "" otherwise) so conditions
/// like `input_truthy` can express skip-when-absent.
pub fn validate_inputs(
    specs: &BTreeMap<String, InputSpec>,
    raw: &HashMap<String, String>,
) -> Result<BTreeMap<String, Value>, RunflowError> {
    let mut problems = Vec::new();
    let mut validated = BTreeMap::new();

    for key in raw.keys() {
        if !specs.contains_key(key) {
            problems.push(format!("unknown input '{key}'"));
        }
    }

    for (name, spec) in specs {
        let supplied = raw.get(name).cloned().or_else(|| spec.default.clone());

        let value = match supplied {
            Some(raw_value) => match coerce(name, spec, &raw_value) {
                Ok(value) => value,
                Err(problem) => {
                    problems.push(problem);
                    continue;
                }
            },
            None if spec.required => {
                problems.push(format!("missing required input '{name}'"));
                continue;
            }
            None => match spec.ty {
                InputType::Bool => Value::Bool(false),
                InputType::String | InputType::Enum => Value::String(String::new()),
            },
        };

        validated.insert(name.clone(), value);
    }

    if problems.is_empty() {
        Ok(validated)
    } else {
        Err(RunflowError::InvalidInputs { problems })
    }
}

/// Coerce one raw value to its declared type
fn coerce(name: &str, spec: &InputSpec, raw: &str) -> Result<Value, String> {
    match spec.ty {
        InputType::String => Ok(Value::String(raw.to_string())),
        InputType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!(
                "input '{name}' expects a boolean (true/false), got '{raw}'"
            )),
        },
        InputType::Enum => {
            if spec.options.iter().any(|o| o == raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(format!(
                    "input '{name}' must be one of [{}], got '{raw}'",
                    spec.options.join(", ")
                ))
            }
        }
    }
}

/// Pipeline definition validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline definition
    pub fn validate(pipeline: &PipelineDefinition) -> ValidationResult {
        let mut result = ValidationResult::new();

        if pipeline.steps.is_empty() {
            result.add_error("Pipeline has no steps defined");
        }

        let mut seen_names = HashSet::new();
        for step in &pipeline.steps {
            if !seen_names.insert(&step.name) {
                result.add_error(&format!("Duplicate step name: '{}'", step.name));
            }
        }

        // Graph structure: unknown deps, forward references, cycles
        match StepGraph::build(pipeline) {
            Ok(_) => {}
            Err(RunflowError::DuplicateStep { .. }) => {
                // already reported above
            }
            Err(e) => result.add_error(&e.to_string()),
        }

        Self::validate_input_specs(pipeline, &mut result);

        for step in &pipeline.steps {
            Self::validate_step(step, pipeline, &mut result);
        }

        Self::validate_output_specs(pipeline, &mut result);

        result
    }

    /// Check declared input specs are internally consistent
    fn validate_input_specs(pipeline: &PipelineDefinition, result: &mut ValidationResult) {
        for (name, spec) in &pipeline.inputs {
            match spec.ty {
                InputType::Enum if spec.options.is_empty() => {
                    result.add_error(&format!("Input '{name}': enum type requires options"));
                }
                InputType::Bool if !spec.options.is_empty() => {
                    result.add_warning(&format!("Input '{name}': options are ignored for bool"));
                }
                _ => {}
            }

            if let Some(default) = &spec.default {
                if let Err(problem) = coerce(name, spec, default) {
                    result.add_error(&format!("Default for {problem}"));
                }
            }
        }
    }

    /// Validate a single step
    fn validate_step(step: &StepSpec, pipeline: &PipelineDefinition, result: &mut ValidationResult) {
        if step.run.trim().is_empty() {
            result.add_error(&format!("Step '{}': run command is empty", step.name));
        }

        let mut seen_outputs = HashSet::new();
        for output in &step.outputs {
            if !seen_outputs.insert(output) {
                result.add_error(&format!(
                    "Step '{}': duplicate output name '{}'",
                    step.name, output
                ));
            }
        }

        for input in step.condition.referenced_inputs() {
            if !pipeline.inputs.contains_key(input) {
                result.add_error(&format!(
                    "Step '{}': condition references unknown input '{}'",
                    step.name, input
                ));
            }
        }

        for dep in step.condition.referenced_steps() {
            if pipeline.get_step(dep).is_some() && !step.needs.contains(&dep.to_string()) {
                result.add_warning(&format!(
                    "Step '{}': condition reads step '{}' but doesn't declare it in needs. \
                     This dependency will be added implicitly.",
                    step.name, dep
                ));
            }
        }

        Self::validate_template(step, pipeline, result);
    }

    /// Check every template reference resolves to something declared
    fn validate_template(
        step: &StepSpec,
        pipeline: &PipelineDefinition,
        result: &mut ValidationResult,
    ) {
        for reference in template::references(&step.run) {
            match reference {
                TemplateRef::Input(name) => {
                    if !pipeline.inputs.contains_key(&name) {
                        result.add_error(&format!(
                            "Step '{}': template references unknown input '{}'",
                            step.name, name
                        ));
                    }
                }
                TemplateRef::StepOutput { step: dep, output } => {
                    match pipeline.get_step(&dep) {
                        None => {
                            result.add_error(&format!(
                                "Step '{}': template references unknown step '{}'",
                                step.name, dep
                            ));
                        }
                        Some(producer) => {
                            if !producer.outputs.contains(&output) {
                                result.add_error(&format!(
                                    "Step '{}': template references undeclared output '{}' of step '{}'",
                                    step.name, output, dep
                                ));
                            }
                            if !step.needs.contains(&dep) {
                                result.add_warning(&format!(
                                    "Step '{}': template reads step '{}' output but doesn't \
                                     declare it in needs. This dependency will be added \
                                     implicitly.",
                                    step.name, dep
                                ));
                            }
                        }
                    }
                }
            }
        }
    }

    /// Check declared pipeline outputs resolve to declared step outputs
    fn validate_output_specs(pipeline: &PipelineDefinition, result: &mut ValidationResult) {
        for (name, spec) in &pipeline.outputs {
            match pipeline.get_step(&spec.step) {
                None => {
                    result.add_error(&format!(
                        "Output '{}': produced by unknown step '{}'",
                        name, spec.step
                    ));
                }
                Some(step) => {
                    let source = spec.source_name(name);
                    if !step.outputs.contains(&source.to_string()) {
                        result.add_error(&format!(
                            "Output '{}': step '{}' does not declare output '{}'",
                            name, spec.step, source
                        ));
                    }
                }
            }
        }
    }
}

/// Result of pipeline validation
#[derive(Debug, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Convert to an error when invalid
    pub fn into_error(self) -> Result<(), RunflowError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(RunflowError::InvalidPipeline {
                reason: self.errors.join("; "),
                help: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(ty: InputType, default: Option<&str>, required: bool, options: &[&str]) -> InputSpec {
        InputSpec {
            ty,
            default: default.map(String::from),
            required,
            options: options.iter().map(|s| s.to_string()).collect(),
            description: None,
        }
    }

    fn specs(entries: Vec<(&str, InputSpec)>) -> BTreeMap<String, InputSpec> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn raw(entries: Vec<(&str, &str)>) -> HashMap<String, String> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_validate_inputs_happy_path() {
        let specs = specs(vec![
            ("version", spec(InputType::String, None, true, &[])),
            ("publish", spec(InputType::Bool, Some("false"), false, &[])),
            (
                "channel",
                spec(InputType::Enum, Some("stable"), false, &["stable", "beta"]),
            ),
        ]);

        let validated = validate_inputs(&specs, &raw(vec![("version", "1.2.3")])).unwrap();

        assert_eq!(validated["version"], Value::String("1.2.3".into()));
        assert_eq!(validated["publish"], Value::Bool(false));
        assert_eq!(validated["channel"], Value::String("stable".into()));
    }

    #[test]
    fn test_validate_inputs_reports_all_problems() {
        let specs = specs(vec![
            ("version", spec(InputType::String, None, true, &[])),
            ("publish", spec(InputType::Bool, None, false, &[])),
        ]);

        let err = validate_inputs(
            &specs,
            &raw(vec![("publish", "maybe"), ("bogus", "1")]),
        )
        .unwrap_err();

        let RunflowError::InvalidInputs { problems } = err else {
            panic!("expected InvalidInputs");
        };
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.contains("version")));
        assert!(problems.iter().any(|p| p.contains("publish")));
        assert!(problems.iter().any(|p| p.contains("bogus")));
    }

    #[test]
    fn test_bool_coercion() {
        let specs = specs(vec![("flag", spec(InputType::Bool, None, true, &[]))]);

        let validated = validate_inputs(&specs, &raw(vec![("flag", "TRUE")])).unwrap();
        assert_eq!(validated["flag"], Value::Bool(true));

        assert!(validate_inputs(&specs, &raw(vec![("flag", "1")])).is_err());
    }

    #[test]
    fn test_enum_membership() {
        let specs = specs(vec![(
            "channel",
            spec(InputType::Enum, None, true, &["stable", "beta"]),
        )]);

        assert!(validate_inputs(&specs, &raw(vec![("channel", "beta")])).is_ok());
        assert!(validate_inputs(&specs, &raw(vec![("channel", "nightly")])).is_err());
    }

    #[test]
    fn test_absent_optional_inputs_get_empty_values() {
        let specs = specs(vec![
            ("token", spec(InputType::String, None, false, &[])),
            ("notify", spec(InputType::Bool, None, false, &[])),
        ]);

        let validated = validate_inputs(&specs, &HashMap::new()).unwrap();
        assert_eq!(validated["token"], Value::String(String::new()));
        assert_eq!(validated["notify"], Value::Bool(false));
        assert!(!validated["token"].is_truthy());
    }

    #[test]
    fn test_validate_empty_pipeline() {
        let pipeline = PipelineDefinition::from_yaml(r#"{name: empty, steps: []}"#).unwrap();
        let result = PipelineValidator::validate(&pipeline);
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("no steps"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let yaml = r#"
name: "test"
steps:
  - name: "dup"
    run: "true"
  - name: "dup"
    run: "true"
"#;
        let pipeline = PipelineDefinition::from_yaml(yaml).unwrap();
        let result = PipelineValidator::validate(&pipeline);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("Duplicate")));
    }

    #[test]
    fn test_validate_forward_reference() {
        let yaml = r#"
name: "test"
steps:
  - name: "a"
    needs: [b]
    run: "true"
  - name: "b"
    run: "true"
"#;
        let pipeline = PipelineDefinition::from_yaml(yaml).unwrap();
        let result = PipelineValidator::validate(&pipeline);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("later-declared")));
    }

    #[test]
    fn test_validate_enum_without_options() {
        let yaml = r#"
name: "test"
inputs:
  channel:
    type: enum
steps:
  - name: "a"
    run: "true"
"#;
        let pipeline = PipelineDefinition::from_yaml(yaml).unwrap();
        let result = PipelineValidator::validate(&pipeline);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("requires options")));
    }

    #[test]
    fn test_validate_bad_default() {
        let yaml = r#"
name: "test"
inputs:
  publish:
    type: bool
    default: "maybe"
steps:
  - name: "a"
    run: "true"
"#;
        let pipeline = PipelineDefinition::from_yaml(yaml).unwrap();
        let result = PipelineValidator::validate(&pipeline);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("boolean")));
    }

    #[test]
    fn test_validate_template_references() {
        let yaml = r#"
name: "test"
steps:
  - name: "a"
    run: "echo ${{ inputs.nope }}"
"#;
        let pipeline = PipelineDefinition::from_yaml(yaml).unwrap();
        let result = PipelineValidator::validate(&pipeline);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("unknown input 'nope'")));
    }

    #[test]
    fn test_condition_reference_without_needs_warns() {
        let yaml = r#"
name: "test"
steps:
  - name: "build"
    run: "true"
  - name: "report"
    condition:
      finished:
        step: build
    run: "true"
"#;
        let pipeline = PipelineDefinition::from_yaml(yaml).unwrap();
        let result = PipelineValidator::validate(&pipeline);
        assert!(result.is_valid());
        assert!(result.has_warnings());
        assert!(result.warnings.iter().any(|w| w.contains("implicitly")));
    }

    #[test]
    fn test_validate_output_spec_against_steps() {
        let yaml = r#"
name: "test"
outputs:
  artifact:
    step: build
    output: nothere
steps:
  - name: "build"
    run: "true"
    outputs: [artifact_path]
"#;
        let pipeline = PipelineDefinition::from_yaml(yaml).unwrap();
        let result = PipelineValidator::validate(&pipeline);
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("does not declare output 'nothere'")));
    }
}

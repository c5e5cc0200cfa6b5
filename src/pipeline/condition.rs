// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Step run conditions
//!
//! A condition is a boolean expression over validated inputs and the
//! status/outputs of earlier steps. Conditions that name a prior step's
//! failure (`failed`, `finished`) are the explicit opt-out from
//! skip-on-failure propagation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::RunflowError;
use crate::pipeline::definition::Value;
use crate::pipeline::state::{ExecutionState, StepStatus};

/// Run condition for a step
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Always run (the default for steps without a condition)
    #[default]
    Always,
    /// Never run
    Never,
    /// Input is truthy (true, or a non-empty string other than "false")
    InputTruthy { input: String },
    /// Input equals a literal value
    InputEquals { input: String, value: String },
    /// A prior step's output equals a literal value
    OutputEquals {
        step: String,
        output: String,
        value: String,
    },
    /// A prior step succeeded
    Succeeded { step: String },
    /// A prior step ran and failed
    Failed { step: String },
    /// A prior step ran to completion, regardless of outcome
    Finished { step: String },
    /// Negation
    Not(Box<Condition>),
    /// All sub-conditions hold
    All(Vec<Condition>),
    /// At least one sub-condition holds
    Any(Vec<Condition>),
}

impl Condition {
    /// Evaluate against validated inputs and the current execution state
    pub fn evaluate(
        &self,
        step_name: &str,
        inputs: &BTreeMap<String, Value>,
        state: &ExecutionState,
    ) -> Result<bool, RunflowError> {
        match self {
            Self::Always => Ok(true),
            Self::Never => Ok(false),
            Self::InputTruthy { input } => {
                let value = Self::lookup_input(step_name, inputs, input)?;
                Ok(value.is_truthy())
            }
            Self::InputEquals { input, value } => {
                let actual = Self::lookup_input(step_name, inputs, input)?;
                Ok(actual.as_str() == value.as_str())
            }
            Self::OutputEquals {
                step,
                output,
                value,
            } => {
                let record = Self::lookup_step(step_name, state, step)?;
                Ok(record.outputs.get(output).is_some_and(|v| v == value))
            }
            Self::Succeeded { step } => {
                let record = Self::lookup_step(step_name, state, step)?;
                Ok(record.status == StepStatus::Succeeded)
            }
            Self::Failed { step } => {
                let record = Self::lookup_step(step_name, state, step)?;
                Ok(record.status == StepStatus::Failed)
            }
            Self::Finished { step } => {
                let record = Self::lookup_step(step_name, state, step)?;
                Ok(matches!(
                    record.status,
                    StepStatus::Succeeded | StepStatus::Failed
                ))
            }
            Self::Not(inner) => Ok(!inner.evaluate(step_name, inputs, state)?),
            Self::All(conditions) => {
                for c in conditions {
                    if !c.evaluate(step_name, inputs, state)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any(conditions) => {
                for c in conditions {
                    if c.evaluate(step_name, inputs, state)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Whether this condition explicitly tolerates `dependency` having failed
    ///
    /// A dependent whose condition mentions the dependency through `failed`
    /// or `finished` is exempt from skip-on-failure propagation.
    pub fn tolerates_failure_of(&self, dependency: &str) -> bool {
        match self {
            Self::Failed { step } | Self::Finished { step } => step == dependency,
            Self::Not(inner) => inner.tolerates_failure_of(dependency),
            Self::All(cs) | Self::Any(cs) => cs.iter().any(|c| c.tolerates_failure_of(dependency)),
            _ => false,
        }
    }

    /// Step names this condition reads (status or outputs)
    pub fn referenced_steps(&self) -> Vec<&str> {
        let mut steps = Vec::new();
        self.collect_steps(&mut steps);
        steps
    }

    fn collect_steps<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::OutputEquals { step, .. }
            | Self::Succeeded { step }
            | Self::Failed { step }
            | Self::Finished { step } => out.push(step),
            Self::Not(inner) => inner.collect_steps(out),
            Self::All(cs) | Self::Any(cs) => {
                for c in cs {
                    c.collect_steps(out);
                }
            }
            _ => {}
        }
    }

    /// Input names this condition reads
    pub fn referenced_inputs(&self) -> Vec<&str> {
        let mut inputs = Vec::new();
        self.collect_inputs(&mut inputs);
        inputs
    }

    fn collect_inputs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::InputTruthy { input } | Self::InputEquals { input, .. } => out.push(input),
            Self::Not(inner) => inner.collect_inputs(out),
            Self::All(cs) | Self::Any(cs) => {
                for c in cs {
                    c.collect_inputs(out);
                }
            }
            _ => {}
        }
    }

    fn lookup_input<'a>(
        step_name: &str,
        inputs: &'a BTreeMap<String, Value>,
        input: &str,
    ) -> Result<&'a Value, RunflowError> {
        inputs
            .get(input)
            .ok_or_else(|| RunflowError::ConditionReference {
                step: step_name.to_string(),
                kind: "input".to_string(),
                name: input.to_string(),
            })
    }

    fn lookup_step<'a>(
        step_name: &str,
        state: &'a ExecutionState,
        step: &str,
    ) -> Result<&'a crate::pipeline::state::StepRecord, RunflowError> {
        state
            .record(step)
            .ok_or_else(|| RunflowError::ConditionReference {
                step: step_name.to_string(),
                kind: "step".to_string(),
                name: step.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(entries: Vec<(&str, StepStatus, Vec<(&str, &str)>)>) -> ExecutionState {
        let mut state = ExecutionState::empty();
        for (name, status, outputs) in entries {
            state.insert_pending(name);
            state.set_status(name, status);
            for (k, v) in outputs {
                state.record_output(name, k, v);
            }
        }
        state
    }

    fn inputs_with(entries: Vec<(&str, Value)>) -> BTreeMap<String, Value> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_always_and_never() {
        let state = ExecutionState::empty();
        let inputs = BTreeMap::new();
        assert!(Condition::Always.evaluate("s", &inputs, &state).unwrap());
        assert!(!Condition::Never.evaluate("s", &inputs, &state).unwrap());
    }

    #[test]
    fn test_input_truthy() {
        let state = ExecutionState::empty();
        let inputs = inputs_with(vec![
            ("publish", Value::Bool(true)),
            ("tag", Value::String("".into())),
        ]);

        let c = Condition::InputTruthy {
            input: "publish".into(),
        };
        assert!(c.evaluate("s", &inputs, &state).unwrap());

        let c = Condition::InputTruthy {
            input: "tag".into(),
        };
        assert!(!c.evaluate("s", &inputs, &state).unwrap());
    }

    #[test]
    fn test_unknown_input_reference_is_error() {
        let state = ExecutionState::empty();
        let inputs = BTreeMap::new();
        let c = Condition::InputTruthy {
            input: "missing".into(),
        };
        let err = c.evaluate("s", &inputs, &state).unwrap_err();
        assert!(matches!(err, RunflowError::ConditionReference { .. }));
    }

    #[test]
    fn test_output_equals() {
        let state = state_with(vec![(
            "build",
            StepStatus::Succeeded,
            vec![("kind", "release")],
        )]);
        let inputs = BTreeMap::new();

        let c = Condition::OutputEquals {
            step: "build".into(),
            output: "kind".into(),
            value: "release".into(),
        };
        assert!(c.evaluate("s", &inputs, &state).unwrap());

        let c = Condition::OutputEquals {
            step: "build".into(),
            output: "kind".into(),
            value: "debug".into(),
        };
        assert!(!c.evaluate("s", &inputs, &state).unwrap());
    }

    #[test]
    fn test_status_conditions() {
        let state = state_with(vec![
            ("ok", StepStatus::Succeeded, vec![]),
            ("bad", StepStatus::Failed, vec![]),
            ("off", StepStatus::Skipped, vec![]),
        ]);
        let inputs = BTreeMap::new();

        let succeeded = |step: &str| Condition::Succeeded { step: step.into() };
        let failed = |step: &str| Condition::Failed { step: step.into() };
        let finished = |step: &str| Condition::Finished { step: step.into() };

        assert!(succeeded("ok").evaluate("s", &inputs, &state).unwrap());
        assert!(!succeeded("bad").evaluate("s", &inputs, &state).unwrap());
        assert!(failed("bad").evaluate("s", &inputs, &state).unwrap());
        assert!(finished("ok").evaluate("s", &inputs, &state).unwrap());
        assert!(finished("bad").evaluate("s", &inputs, &state).unwrap());
        // skipped is not finished
        assert!(!finished("off").evaluate("s", &inputs, &state).unwrap());
    }

    #[test]
    fn test_combinators() {
        let state = state_with(vec![("build", StepStatus::Succeeded, vec![])]);
        let inputs = inputs_with(vec![("publish", Value::Bool(true))]);

        let c = Condition::All(vec![
            Condition::Succeeded {
                step: "build".into(),
            },
            Condition::InputTruthy {
                input: "publish".into(),
            },
        ]);
        assert!(c.evaluate("s", &inputs, &state).unwrap());

        let c = Condition::Not(Box::new(Condition::Never));
        assert!(c.evaluate("s", &inputs, &state).unwrap());

        let c = Condition::Any(vec![Condition::Never, Condition::Always]);
        assert!(c.evaluate("s", &inputs, &state).unwrap());
    }

    #[test]
    fn test_tolerates_failure() {
        let c = Condition::Failed {
            step: "build".into(),
        };
        assert!(c.tolerates_failure_of("build"));
        assert!(!c.tolerates_failure_of("test"));

        let c = Condition::All(vec![
            Condition::Finished {
                step: "build".into(),
            },
            Condition::InputTruthy {
                input: "notify".into(),
            },
        ]);
        assert!(c.tolerates_failure_of("build"));

        let c = Condition::Succeeded {
            step: "build".into(),
        };
        assert!(!c.tolerates_failure_of("build"));
    }

    #[test]
    fn test_referenced_names() {
        let c = Condition::All(vec![
            Condition::OutputEquals {
                step: "build".into(),
                output: "kind".into(),
                value: "release".into(),
            },
            Condition::InputEquals {
                input: "channel".into(),
                value: "stable".into(),
            },
        ]);
        assert_eq!(c.referenced_steps(), vec!["build"]);
        assert_eq!(c.referenced_inputs(), vec!["channel"]);
    }

    #[test]
    fn test_condition_yaml_forms() {
        let c: Condition = serde_yaml::from_str("always").unwrap();
        assert!(matches!(c, Condition::Always));

        let c: Condition = serde_yaml::from_str(
            r#"
output_equals:
  step: build
  output: kind
  value: release
"#,
        )
        .unwrap();
        assert!(matches!(c, Condition::OutputEquals { .. }));

        let c: Condition = serde_yaml::from_str(
            r#"
any:
  - failed:
      step: build
  - input_truthy:
      input: force
"#,
        )
        .unwrap();
        assert!(c.tolerates_failure_of("build"));
    }
}

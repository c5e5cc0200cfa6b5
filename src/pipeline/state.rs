// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Per-run execution state
//!
//! One `ExecutionState` is created fresh per run, owned exclusively by the
//! engine, and always holds a status for every step so partial progress is
//! inspectable after interruption.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::pipeline::PipelineDefinition;

/// Status of a single step within a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not yet reached
    Pending,
    /// Condition was false, or an upstream failure/skip propagated
    Skipped,
    /// Command currently executing
    Running,
    /// Command exited zero
    Succeeded,
    /// Command exited non-zero, or could not be invoked
    Failed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Skipped => write!(f, "skipped"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Record for one step: status plus everything the command produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub status: StepStatus,

    /// Exit code of the command, when one ran
    pub exit_code: Option<i32>,

    /// Captured outputs, filtered to the step's declared names
    pub outputs: HashMap<String, String>,

    pub stdout: String,
    pub stderr: String,

    /// Wall-clock duration of the command, when one ran
    pub duration: Option<Duration>,
}

impl StepRecord {
    fn pending() -> Self {
        Self {
            status: StepStatus::Pending,
            exit_code: None,
            outputs: HashMap::new(),
            stdout: String::new(),
            stderr: String::new(),
            duration: None,
        }
    }
}

/// Mapping from step name to its record, in declaration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    order: Vec<String>,
    records: HashMap<String, StepRecord>,
}

impl ExecutionState {
    /// Create state for a pipeline with every step Pending
    pub fn new(pipeline: &PipelineDefinition) -> Self {
        let mut state = Self::empty();
        for step in &pipeline.steps {
            state.insert_pending(&step.name);
        }
        state
    }

    /// Create an empty state
    pub fn empty() -> Self {
        Self {
            order: Vec::new(),
            records: HashMap::new(),
        }
    }

    /// Register a step as Pending
    pub fn insert_pending(&mut self, name: &str) {
        if !self.records.contains_key(name) {
            self.order.push(name.to_string());
            self.records.insert(name.to_string(), StepRecord::pending());
        }
    }

    /// Look up a step's record
    pub fn record(&self, name: &str) -> Option<&StepRecord> {
        self.records.get(name)
    }

    /// Look up a step's record mutably
    pub fn record_mut(&mut self, name: &str) -> Option<&mut StepRecord> {
        self.records.get_mut(name)
    }

    /// Set a step's status
    pub fn set_status(&mut self, name: &str, status: StepStatus) {
        if let Some(record) = self.records.get_mut(name) {
            record.status = status;
        }
    }

    /// Record a single captured output for a step
    pub fn record_output(&mut self, name: &str, key: &str, value: &str) {
        if let Some(record) = self.records.get_mut(name) {
            record.outputs.insert(key.to_string(), value.to_string());
        }
    }

    /// Iterate records in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StepRecord)> {
        self.order
            .iter()
            .filter_map(|name| self.records.get(name).map(|r| (name.as_str(), r)))
    }

    /// Number of steps tracked
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no steps are tracked
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Overall outcome of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    /// First failure's step name and exit code
    Failed {
        step: String,
        exit_code: Option<i32>,
    },
    /// Every step finished cleanly but a required output never materialized
    MissingOutput { output: String, step: String },
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Result of one pipeline run: full per-step report plus aggregated outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Pipeline name
    pub pipeline: String,

    /// Overall status
    pub status: RunStatus,

    /// Per-step records, complete even on failure
    pub state: ExecutionState,

    /// Aggregated declared outputs
    pub outputs: BTreeMap<String, String>,

    /// Total run duration
    pub duration: Duration,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_starts_all_pending() {
        let yaml = r#"
name: "t"
steps:
  - name: "a"
    run: "true"
  - name: "b"
    run: "true"
"#;
        let pipeline = PipelineDefinition::from_yaml(yaml).unwrap();
        let state = ExecutionState::new(&pipeline);

        assert_eq!(state.len(), 2);
        for (_, record) in state.iter() {
            assert_eq!(record.status, StepStatus::Pending);
            assert!(record.outputs.is_empty());
        }
    }

    #[test]
    fn test_iteration_preserves_declaration_order() {
        let mut state = ExecutionState::empty();
        for name in ["build", "test", "publish"] {
            state.insert_pending(name);
        }
        let names: Vec<_> = state.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["build", "test", "publish"]);
    }

    #[test]
    fn test_record_output() {
        let mut state = ExecutionState::empty();
        state.insert_pending("build");
        state.record_output("build", "artifact", "dist/app.tar.gz");
        state.set_status("build", StepStatus::Succeeded);

        let record = state.record("build").unwrap();
        assert_eq!(record.status, StepStatus::Succeeded);
        assert_eq!(record.outputs["artifact"], "dist/app.tar.gz");
    }

    #[test]
    fn test_run_status_serialization() {
        let status = RunStatus::Failed {
            step: "build".into(),
            exit_code: Some(1),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("build"));
        let back: RunStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }
}

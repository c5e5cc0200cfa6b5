// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Pipeline definition structures
//!
//! Defines the schema for runflow pipeline files: typed inputs, declared
//! outputs, and an ordered list of steps with conditions and dependencies.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::pipeline::Condition;

/// Pipeline definition from a runflow YAML file
///
/// Immutable once loaded; all execution state lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Pipeline version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Pipeline name
    pub name: String,

    /// Pipeline description
    #[serde(default)]
    pub description: Option<String>,

    /// Declared inputs (name → spec)
    #[serde(default)]
    pub inputs: BTreeMap<String, InputSpec>,

    /// Declared outputs (name → spec)
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputSpec>,

    /// Steps in declaration order
    pub steps: Vec<StepSpec>,

    /// Global environment variables passed to every command
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_version() -> String {
    "1".to_string()
}

impl PipelineDefinition {
    /// Load a pipeline from a YAML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::RunflowError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::RunflowError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            }
        })?;

        Self::from_yaml(&content)
    }

    /// Parse a pipeline from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, crate::RunflowError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Serialize the pipeline to YAML
    pub fn to_yaml(&self) -> Result<String, crate::RunflowError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a step by name
    pub fn get_step(&self, name: &str) -> Option<&StepSpec> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Position of a step in declaration order
    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    /// All step names in declaration order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Declared input for a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    /// Input type
    #[serde(rename = "type", default)]
    pub ty: InputType,

    /// Default applied when no value is supplied; coerced like any value
    #[serde(default)]
    pub default: Option<String>,

    /// Whether the input must be supplied (or defaulted)
    #[serde(default)]
    pub required: bool,

    /// Allowed values for `enum` inputs
    #[serde(default)]
    pub options: Vec<String>,

    /// Input description
    #[serde(default)]
    pub description: Option<String>,
}

/// Input types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    String,
    Bool,
    Enum,
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Bool => write!(f, "bool"),
            Self::Enum => write!(f, "enum"),
        }
    }
}

/// A validated input value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    String(String),
}

impl Value {
    /// Truthiness for condition evaluation: booleans are themselves,
    /// strings are truthy when non-empty and not "false"
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::String(s) => !s.is_empty() && s != "false",
        }
    }

    /// String form used by template rendering and equality conditions
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Bool(b) => std::borrow::Cow::Owned(b.to_string()),
            Self::String(s) => std::borrow::Cow::Borrowed(s),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared pipeline output, resolved from a step's captured outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Step that produces this output
    pub step: String,

    /// Output name within the producing step (defaults to the declared key)
    #[serde(default)]
    pub output: Option<String>,

    /// Fail aggregation if the output never materializes
    #[serde(default)]
    pub required: bool,

    /// Output description
    #[serde(default)]
    pub description: Option<String>,
}

impl OutputSpec {
    /// Name of the output within the producing step
    pub fn source_name<'a>(&'a self, declared_key: &'a str) -> &'a str {
        self.output.as_deref().unwrap_or(declared_key)
    }
}

/// A single pipeline step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    /// Step name (must be unique within the pipeline)
    pub name: String,

    /// Step description
    #[serde(default)]
    pub description: Option<String>,

    /// Run condition over inputs and prior step outputs/status
    #[serde(default)]
    pub condition: Condition,

    /// Command template to execute
    pub run: String,

    /// Output names this step is expected to emit
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Steps whose outputs this step reads (must be declared earlier)
    #[serde(default)]
    pub needs: Vec<String>,

    /// Environment variables for this step's command
    #[serde(default)]
    pub env: HashMap<String, String>,
}

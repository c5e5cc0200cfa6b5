// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Command template rendering
//!
//! Templates interpolate `${{ inputs.NAME }}` and
//! `${{ steps.STEP.outputs.NAME }}` before the command is handed to the
//! runner. Unresolvable references are errors, never silently empty.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::errors::RunflowError;
use crate::pipeline::definition::Value;
use crate::pipeline::state::ExecutionState;

/// A reference found inside a command template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    /// `inputs.NAME`
    Input(String),
    /// `steps.STEP.outputs.NAME`
    StepOutput { step: String, output: String },
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{\{\s*([^}\s][^}]*?)\s*\}\}").expect("valid regex"))
}

/// Parse a dotted reference path
fn parse_reference(path: &str) -> Option<TemplateRef> {
    let parts: Vec<&str> = path.split('.').collect();
    match parts.as_slice() {
        ["inputs", name] if !name.is_empty() => Some(TemplateRef::Input(name.to_string())),
        ["steps", step, "outputs", output] if !step.is_empty() && !output.is_empty() => {
            Some(TemplateRef::StepOutput {
                step: step.to_string(),
                output: output.to_string(),
            })
        }
        _ => None,
    }
}

/// All well-formed references in a template, in order of appearance
pub fn references(template: &str) -> Vec<TemplateRef> {
    placeholder_regex()
        .captures_iter(template)
        .filter_map(|cap| parse_reference(&cap[1]))
        .collect()
}

/// Render a command template against validated inputs and prior step outputs
pub fn render(
    step_name: &str,
    template: &str,
    inputs: &BTreeMap<String, Value>,
    state: &ExecutionState,
) -> Result<String, RunflowError> {
    let mut result = String::with_capacity(template.len());
    let mut last_end = 0;

    for cap in placeholder_regex().captures_iter(template) {
        let whole = cap.get(0).expect("capture group 0 always present");
        let path = &cap[1];

        let unresolvable = || RunflowError::TemplateReference {
            step: step_name.to_string(),
            reference: path.to_string(),
        };

        let value = match parse_reference(path).ok_or_else(unresolvable)? {
            TemplateRef::Input(name) => inputs
                .get(&name)
                .map(|v| v.as_str().into_owned())
                .ok_or_else(unresolvable)?,
            TemplateRef::StepOutput { step, output } => state
                .record(&step)
                .and_then(|r| r.outputs.get(&output))
                .cloned()
                .ok_or_else(unresolvable)?,
        };

        result.push_str(&template[last_end..whole.start()]);
        result.push_str(&value);
        last_end = whole.end();
    }

    result.push_str(&template[last_end..]);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::state::StepStatus;

    fn inputs() -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        map.insert("version".to_string(), Value::String("1.2.3".into()));
        map.insert("publish".to_string(), Value::Bool(true));
        map
    }

    fn state() -> ExecutionState {
        let mut state = ExecutionState::empty();
        state.insert_pending("build");
        state.set_status("build", StepStatus::Succeeded);
        state.record_output("build", "artifact", "dist/app.tar.gz");
        state
    }

    #[test]
    fn test_render_input() {
        let rendered = render("s", "make build VERSION=${{ inputs.version }}", &inputs(), &state())
            .unwrap();
        assert_eq!(rendered, "make build VERSION=1.2.3");
    }

    #[test]
    fn test_render_bool_input() {
        let rendered = render("s", "flag=${{ inputs.publish }}", &inputs(), &state()).unwrap();
        assert_eq!(rendered, "flag=true");
    }

    #[test]
    fn test_render_step_output() {
        let rendered = render(
            "s",
            "upload ${{ steps.build.outputs.artifact }}",
            &inputs(),
            &state(),
        )
        .unwrap();
        assert_eq!(rendered, "upload dist/app.tar.gz");
    }

    #[test]
    fn test_render_multiple_references() {
        let rendered = render(
            "s",
            "publish ${{ steps.build.outputs.artifact }} --version ${{ inputs.version }}",
            &inputs(),
            &state(),
        )
        .unwrap();
        assert_eq!(rendered, "publish dist/app.tar.gz --version 1.2.3");
    }

    #[test]
    fn test_no_placeholders_passes_through() {
        let rendered = render("s", "echo plain", &inputs(), &state()).unwrap();
        assert_eq!(rendered, "echo plain");
    }

    #[test]
    fn test_unknown_input_is_error() {
        let err = render("s", "echo ${{ inputs.missing }}", &inputs(), &state()).unwrap_err();
        assert!(matches!(err, RunflowError::TemplateReference { .. }));
    }

    #[test]
    fn test_unknown_step_output_is_error() {
        let err = render(
            "s",
            "echo ${{ steps.build.outputs.missing }}",
            &inputs(),
            &state(),
        )
        .unwrap_err();
        assert!(matches!(err, RunflowError::TemplateReference { .. }));
    }

    #[test]
    fn test_malformed_path_is_error() {
        let err = render("s", "echo ${{ secrets.token }}", &inputs(), &state()).unwrap_err();
        assert!(matches!(err, RunflowError::TemplateReference { .. }));
    }

    #[test]
    fn test_references_extraction() {
        let refs = references(
            "run ${{ inputs.version }} and ${{ steps.build.outputs.artifact }} and ${{ bogus }}",
        );
        assert_eq!(
            refs,
            vec![
                TemplateRef::Input("version".into()),
                TemplateRef::StepOutput {
                    step: "build".into(),
                    output: "artifact".into(),
                },
            ]
        );
    }
}

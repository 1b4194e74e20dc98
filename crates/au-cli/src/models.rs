use std::path::Path;

use au_core::{InterpreterError, ParameterDeclaration, SourceLocation};
use au_scanner::{ScannedScript, ScriptFunction};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScanReport {
    pub(crate) scripts: Vec<ScriptReport>,
    pub(crate) errors: Vec<ErrorReport>,
}

impl ScanReport {
    pub(crate) fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScriptReport {
    pub(crate) path: String,
    pub(crate) include_once: bool,
    pub(crate) functions: Vec<FunctionReport>,
    pub(crate) startup_functions: Vec<String>,
    pub(crate) exit_functions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FunctionReport {
    pub(crate) name: String,
    pub(crate) location: SourceLocation,
    pub(crate) volatile: bool,
    pub(crate) parameters: Vec<ParameterDeclaration>,
    pub(crate) line_count: usize,
    pub(crate) labels: Vec<LabelReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LabelReport {
    pub(crate) name: String,
    pub(crate) location: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorReport {
    pub(crate) file: String,
    pub(crate) key: String,
    pub(crate) location: SourceLocation,
    pub(crate) args: Vec<String>,
}

impl ScriptReport {
    /// Main function first, then declared functions by name.
    pub(crate) fn from_script(script: &ScannedScript) -> Self {
        let mut functions = script
            .functions()
            .filter_map(ScriptFunction::as_defined)
            .map(|function| {
                let mut labels = function
                    .jump_labels()
                    .map(|label| LabelReport {
                        name: label.name().to_string(),
                        location: label.location().clone(),
                    })
                    .collect::<Vec<_>>();
                labels.sort_by(|left, right| left.location.cmp(&right.location));

                FunctionReport {
                    name: function.name().to_string(),
                    location: function.location(),
                    volatile: function.is_volatile(),
                    parameters: function.parameters().to_vec(),
                    line_count: function.line_count(),
                    labels,
                }
            })
            .collect::<Vec<_>>();
        functions.sort_by_key(|function| {
            (
                !function.name.eq_ignore_ascii_case(au_scanner::GLOBAL_FUNC),
                function.name.to_uppercase(),
            )
        });

        let names = |hooks: &[(String, SourceLocation)]| {
            hooks.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>()
        };

        Self {
            path: script.location().display().to_string(),
            include_once: script.include_once(),
            functions,
            startup_functions: names(script.startup_functions()),
            exit_functions: names(script.exit_functions()),
        }
    }
}

impl ErrorReport {
    pub(crate) fn from_error(file: &Path, error: &InterpreterError) -> Self {
        Self {
            file: file.display().to_string(),
            key: error.key.clone(),
            location: error.location.clone(),
            args: error.args.clone(),
        }
    }
}

use std::fmt::Display;

use thiserror::Error;

/// A failure of the command line itself, as opposed to a script that did not scan.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub(crate) struct CliError {
    pub(crate) code: &'static str,
    pub(crate) message: String,
}

impl CliError {
    pub(crate) fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn map_error(code: &'static str, error: impl Display) -> CliError {
    CliError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: CliError) -> i32 {
    eprintln!("RESULT:ERROR");
    eprintln!("ERROR_CODE:{}", error.code);
    eprintln!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| format!("{:?}", error.message))
    );
    1
}

pub(crate) fn map_cli_source_walk(error: walkdir::Error) -> CliError {
    map_error("CLI_SOURCE_WALK", error)
}

pub(crate) fn map_cli_report_json(error: serde_json::Error) -> CliError {
    map_error("CLI_REPORT_JSON", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(CliError::new("ERR", "failed"));
        assert_eq!(code, 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        let json_error = serde_json::from_str::<u8>("nope").expect_err("invalid json");
        assert_eq!(map_cli_report_json(json_error).code, "CLI_REPORT_JSON");
        assert_eq!(
            CliError::new("CLI_SOURCE_EMPTY", "nothing").to_string(),
            "CLI_SOURCE_EMPTY: nothing"
        );
    }
}

use crate::error::InterpreterError;
use crate::value::Variant;

/// Error code reported when an extended value accompanies an error without an
/// explicit code.
pub const EXTENDED_ERROR_CODE: i32 = -1;

/// The outcome of one function invocation, shared by native and script
/// functions.
///
/// `Fatal` aborts evaluation. `Error` is ordinary script-level data flow: the
/// language's `@error`/`@extended` channel, never a failure of the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionReturnValue {
    Fatal(InterpreterError),
    Success {
        value: Variant,
    },
    SuccessExtended {
        value: Variant,
        extended: Variant,
    },
    Error {
        value: Variant,
        code: i32,
        extended: Option<Variant>,
    },
}

/// Borrowed view of a script-level error result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptError<'a> {
    pub value: &'a Variant,
    pub code: i32,
    pub extended: Option<&'a Variant>,
}

impl FunctionReturnValue {
    pub fn success(value: impl Into<Variant>) -> Self {
        Self::Success {
            value: value.into(),
        }
    }

    pub fn success_extended(value: impl Into<Variant>, extended: impl Into<Variant>) -> Self {
        Self::SuccessExtended {
            value: value.into(),
            extended: extended.into(),
        }
    }

    pub fn fatal(error: InterpreterError) -> Self {
        Self::Fatal(error)
    }

    pub fn error(code: i32) -> Self {
        Self::Error {
            value: Variant::FALSE,
            code,
            extended: None,
        }
    }

    /// An error carrying an extended value. Without an explicit code the code
    /// becomes [`EXTENDED_ERROR_CODE`].
    pub fn error_extended(code: Option<i32>, extended: impl Into<Variant>) -> Self {
        Self::error_with_value(Variant::FALSE, code, extended)
    }

    pub fn error_with_value(
        value: impl Into<Variant>,
        code: Option<i32>,
        extended: impl Into<Variant>,
    ) -> Self {
        Self::Error {
            value: value.into(),
            code: code.unwrap_or(EXTENDED_ERROR_CODE),
            extended: Some(extended.into()),
        }
    }

    pub fn as_fatal(&self) -> Option<&InterpreterError> {
        match self {
            Self::Fatal(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.as_fatal().is_some()
    }

    pub fn as_error(&self) -> Option<ScriptError<'_>> {
        match self {
            Self::Error {
                value,
                code,
                extended,
            } => Some(ScriptError {
                value,
                code: *code,
                extended: extended.as_ref(),
            }),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.as_error().is_some()
    }

    /// The returned value and optional extended value of a successful call.
    pub fn as_success(&self) -> Option<(&Variant, Option<&Variant>)> {
        match self {
            Self::Success { value } => Some((value, None)),
            Self::SuccessExtended { value, extended } => Some((value, Some(extended))),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.as_success().is_some()
    }

    /// The value visible to script code, regardless of error state.
    pub fn value(&self) -> Option<&Variant> {
        match self {
            Self::Fatal(_) => None,
            Self::Success { value }
            | Self::SuccessExtended { value, .. }
            | Self::Error { value, .. } => Some(value),
        }
    }

    /// Converts to a `Result` that only fails on fatal errors.
    pub fn into_result(self) -> Result<Self, InterpreterError> {
        match self {
            Self::Fatal(error) => Err(error),
            other => Ok(other),
        }
    }
}

impl From<Variant> for FunctionReturnValue {
    fn from(value: Variant) -> Self {
        Self::success(value)
    }
}

impl From<InterpreterError> for FunctionReturnValue {
    fn from(error: InterpreterError) -> Self {
        Self::fatal(error)
    }
}

impl From<Result<Variant, InterpreterError>> for FunctionReturnValue {
    fn from(result: Result<Variant, InterpreterError>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(error) => Self::fatal(error),
        }
    }
}

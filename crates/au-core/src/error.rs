use crate::types::SourceLocation;
use thiserror::Error;

/// Well-known structural error keys. Rendering them into human text is left
/// to whoever owns the language packs.
pub mod keys {
    pub const UNRESOLVED_SCRIPT: &str = "error.unresolved_script";
    pub const UNEXPECTED_LINE_CONT: &str = "error.unexpected_line_cont";
    pub const EXPERIMENTAL_ONE_LINER: &str = "error.experimental.one_liner";
    pub const EXPERIMENTAL_GOTO: &str = "error.experimental.goto_instructions";
    pub const RESERVED_NAME: &str = "error.reserved_name";
    pub const UNEXPECTED_FUNC: &str = "error.unexpected_func";
    pub const UNEXPECTED_ENDFUNC: &str = "error.unexpected_endfunc";
    pub const UNEXPECTED_EOF: &str = "error.unexpected_eof";
    pub const DUPLICATE_FUNCTION: &str = "error.duplicate_function";
    pub const DUPLICATE_PARAM: &str = "error.duplicate_param";
    pub const DUPLICATE_JUMPLABEL: &str = "error.duplicate_jumplabel";
    pub const BYREF_DEFAULT: &str = "error.byref_default";
    pub const MISSING_DEFAULT: &str = "error.missing_default";
    pub const UNPARSABLE_LINE: &str = "error.unparsable_line";
    pub const UNHANDLED_PRAGMA_KEY: &str = "error.unhandled_pragma_key";
    pub const UNHANDLED_PRAGMA_OPTION: &str = "error.unhandled_pragma_option";
    pub const DUPLICATE_PRAGMA_PROCESSOR: &str = "error.duplicate_pragma_processor";
    pub const NOT_YET_IMPLEMENTED: &str = "error.not_yet_implemented";
    pub const UNRESOLVED_FUNC: &str = "error.unresolved_func";
    pub const REGISTER_FUNC_ARGCOUNT: &str = "error.register_func_argcount";
}

/// A recoverable, location-tagged failure describing malformed source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{key} at {location}{}", render_args(.args))]
pub struct InterpreterError {
    pub key: String,
    pub location: SourceLocation,
    pub args: Vec<String>,
}

impl InterpreterError {
    pub fn well_known<I, S>(location: SourceLocation, key: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            key: key.into(),
            location,
            args: args.into_iter().map(|arg| arg.to_string()).collect(),
        }
    }

    pub fn bare(location: SourceLocation, key: impl Into<String>) -> Self {
        Self::well_known(location, key, Vec::<String>::new())
    }

    pub fn is(&self, key: &str) -> bool {
        self.key == key
    }
}

fn render_args(args: &[String]) -> String {
    if args.is_empty() {
        String::new()
    } else {
        format!(": {}", args.join(", "))
    }
}

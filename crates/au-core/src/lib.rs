pub mod call_result;
pub mod error;
pub mod types;
pub mod value;

pub use call_result::{FunctionReturnValue, ScriptError, EXTENDED_ERROR_CODE};
pub use error::InterpreterError;
pub use types::*;
pub use value::*;

mod builder;
mod function;
mod normalize;
mod options;
mod plugins;
mod pragma;
mod resolver;
mod scanner;
mod script;

pub use function::{
    is_reserved_name, DefinedFunction, JumpLabel, NativeFunction, ScriptFunction, GLOBAL_FUNC,
    RESERVED_NAMES,
};
pub use normalize::{normalize_source, trim_comment, LogicalLine, NormalizedSource};
pub use options::ScannerOptions;
pub use plugins::{
    DefaultParameterParser, FunctionProvider, NativeCallFrame, NativeEntryPoint, ParameterCount,
    ParameterParser, PluginRegistry, PragmaProcessor, ProvidedNativeFunction,
};
pub use pragma::{parse_pragma, process_pragma, PragmaDirective, COMPILE_KEYS, COMPILE_OPTION};
#[cfg(feature = "remote")]
pub use resolver::{FtpResolver, HttpResolver};
pub use resolver::{
    canonical_key, FileSystemResolver, IncludeResolver, ResolveError, ResolvedScript,
    SCRIPT_EXTENSIONS,
};
pub use scanner::{ScriptScanner, NATIVE_SCRIPT};
pub use script::{CallFrame, ScannedScript, ScriptState};

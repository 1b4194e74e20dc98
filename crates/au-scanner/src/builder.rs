use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use au_core::error::keys;
use au_core::{InterpreterError, ParameterDeclaration, SourceLocation};
use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::function::{is_reserved_name, lookup_key, DefinedFunction, ScriptFunction, GLOBAL_FUNC};
use crate::normalize::{LogicalLine, NormalizedSource};
use crate::plugins::{ParameterParser, PragmaProcessor};
use crate::pragma::{pragma_regex, process_pragma, PragmaDirective};
use crate::script::ScannedScript;

type LineHandler =
    fn(&mut TableBuilder<'_>, &Captures<'_>, &SourceLocation) -> Result<(), InterpreterError>;

/// Line classification, highest priority first. A line matching none of these
/// is body content of the current function.
const LINE_RULES: &[(&str, fn() -> &'static Regex, LineHandler)] = &[
    ("include-once", include_once_regex, on_include_once),
    ("startup-register", startup_register_regex, on_startup_register),
    ("exit-register", exit_register_regex, on_exit_register),
    ("pragma", pragma_regex, on_pragma),
    ("func", func_regex, on_func),
    ("endfunc", endfunc_regex, on_endfunc),
    ("label", label_regex, on_label),
];

/// Everything outside the file itself that the builder consults.
pub(crate) struct BuildContext<'a> {
    pub strict_mode: bool,
    pub pragma_processors: &'a [Arc<dyn PragmaProcessor>],
    pub parameter_parser: &'a dyn ParameterParser,
    /// Looks a name up in the global function index.
    pub registered: &'a dyn Fn(&str) -> Option<ScriptFunction>,
}

/// Builds the function and label table of one file from its normalized lines.
pub(crate) fn build_script(
    path: &Path,
    source: &NormalizedSource,
    context: &BuildContext<'_>,
) -> Result<ScannedScript, InterpreterError> {
    let mut builder = TableBuilder::new(path, context);
    for line in &source.lines {
        builder.accept(line)?;
    }
    builder.finish(source.physical_line_count)
}

struct TableBuilder<'a> {
    path: PathBuf,
    file: String,
    context: &'a BuildContext<'a>,
    main: DefinedFunction,
    /// The function between `func` and `endfunc`; `None` at global scope.
    open: Option<DefinedFunction>,
    /// Declared functions already closed by `endfunc`.
    functions: HashMap<String, DefinedFunction>,
    startup: Vec<(String, SourceLocation)>,
    exit: Vec<(String, SourceLocation)>,
    include_once: bool,
}

impl<'a> TableBuilder<'a> {
    fn new(path: &Path, context: &'a BuildContext<'a>) -> Self {
        let file = path.to_string_lossy().into_owned();
        let main = DefinedFunction::new(
            path.to_path_buf(),
            GLOBAL_FUNC,
            SourceLocation::new(file.clone(), 1),
            Vec::new(),
        );
        Self {
            path: path.to_path_buf(),
            file,
            context,
            main,
            open: None,
            functions: HashMap::new(),
            startup: Vec::new(),
            exit: Vec::new(),
            include_once: false,
        }
    }

    fn accept(&mut self, line: &LogicalLine) -> Result<(), InterpreterError> {
        for (rule, regex, handler) in LINE_RULES {
            if let Some(caps) = regex().captures(&line.text) {
                trace!(rule, location = %line.location, "classified line");
                return handler(self, &caps, &line.location);
            }
        }
        self.current_function().add_line(line.location.clone(), line.text.as_str());
        Ok(())
    }

    fn finish(self, physical_line_count: usize) -> Result<ScannedScript, InterpreterError> {
        if let Some(open) = &self.open {
            return Err(InterpreterError::well_known(
                SourceLocation::new(self.file.clone(), physical_line_count + 1),
                keys::UNEXPECTED_EOF,
                [open.name()],
            ));
        }

        let functions = self
            .functions
            .into_iter()
            .chain([(lookup_key(GLOBAL_FUNC), self.main)])
            .map(|(key, function)| (key, ScriptFunction::Defined(Arc::new(function))))
            .collect();
        Ok(ScannedScript::new(
            self.path,
            functions,
            self.startup,
            self.exit,
            self.include_once,
        ))
    }

    fn current_function(&mut self) -> &mut DefinedFunction {
        match &mut self.open {
            Some(function) => function,
            None => &mut self.main,
        }
    }

    /// Where `key` was declared before, if anywhere that conflicts. Entries in
    /// the global index owned by this very file come from an earlier scan of
    /// the same path and do not conflict.
    fn prior_declaration(&self, key: &str) -> Option<SourceLocation> {
        if let Some(local) = self.functions.get(key) {
            return Some(local.declared_at().clone());
        }
        match (self.context.registered)(key) {
            Some(ScriptFunction::Defined(function)) if function.script_path() == self.path => None,
            Some(function) => Some(function.location()),
            None => None,
        }
    }
}

fn on_include_once(
    builder: &mut TableBuilder<'_>,
    _: &Captures<'_>,
    _: &SourceLocation,
) -> Result<(), InterpreterError> {
    builder.include_once = true;
    Ok(())
}

fn on_startup_register(
    builder: &mut TableBuilder<'_>,
    caps: &Captures<'_>,
    location: &SourceLocation,
) -> Result<(), InterpreterError> {
    let name = lookup_key(capture(caps, "func"));
    builder.startup.push((name, location.clone()));
    Ok(())
}

fn on_exit_register(
    builder: &mut TableBuilder<'_>,
    caps: &Captures<'_>,
    location: &SourceLocation,
) -> Result<(), InterpreterError> {
    let name = lookup_key(capture(caps, "func"));
    builder.exit.push((name, location.clone()));
    Ok(())
}

fn on_pragma(
    builder: &mut TableBuilder<'_>,
    caps: &Captures<'_>,
    location: &SourceLocation,
) -> Result<(), InterpreterError> {
    let directive = PragmaDirective::from_captures(caps);
    process_pragma(location, &directive, builder.context.pragma_processors)
}

fn on_func(
    builder: &mut TableBuilder<'_>,
    caps: &Captures<'_>,
    location: &SourceLocation,
) -> Result<(), InterpreterError> {
    let name = capture(caps, "name");
    let raw_params = capture(caps, "args");
    let key = lookup_key(name);

    if let Some(open) = &builder.open {
        return Err(InterpreterError::well_known(
            location.clone(),
            keys::UNEXPECTED_FUNC,
            [open.name()],
        ));
    }
    if is_reserved_name(name) {
        return Err(InterpreterError::well_known(
            location.clone(),
            keys::RESERVED_NAME,
            [name],
        ));
    }
    if let Some(prior) = builder.prior_declaration(&key) {
        return Err(InterpreterError::well_known(
            location.clone(),
            keys::DUPLICATE_FUNCTION,
            [name.to_string(), prior.to_string()],
        ));
    }

    let parameters = builder
        .context
        .parameter_parser
        .parse(raw_params)
        .map_err(|error| {
            InterpreterError::well_known(
                location.clone(),
                keys::UNPARSABLE_LINE,
                [raw_params.to_string(), error.to_string()],
            )
        })?;
    validate_parameters(location, &parameters)?;

    let mut function =
        DefinedFunction::new(builder.path.clone(), name, location.clone(), parameters);
    function.set_volatile(caps.name("volatile").is_some());
    debug!(
        script = %builder.path.display(),
        function = name,
        parameters = function.parameters().len(),
        volatile = function.is_volatile(),
        "scanned function declaration"
    );

    builder.open = Some(function);
    Ok(())
}

fn on_endfunc(
    builder: &mut TableBuilder<'_>,
    _: &Captures<'_>,
    location: &SourceLocation,
) -> Result<(), InterpreterError> {
    let Some(function) = builder.open.take() else {
        return Err(InterpreterError::bare(location.clone(), keys::UNEXPECTED_ENDFUNC));
    };
    builder.functions.insert(lookup_key(function.name()), function);
    Ok(())
}

fn on_label(
    builder: &mut TableBuilder<'_>,
    caps: &Captures<'_>,
    location: &SourceLocation,
) -> Result<(), InterpreterError> {
    if builder.context.strict_mode {
        return Err(InterpreterError::bare(location.clone(), keys::EXPERIMENTAL_GOTO));
    }

    let name = capture(caps, "name");
    let function = builder.current_function();
    if let Some(prior) = function.jump_label(name) {
        return Err(InterpreterError::well_known(
            location.clone(),
            keys::DUPLICATE_JUMPLABEL,
            [name.to_string(), prior.location().to_string()],
        ));
    }
    function.add_jump_label(location.clone(), name);
    function.add_line(location.clone(), "");
    Ok(())
}

/// Checks duplicate names over the whole list first, then walks the list in
/// order for by-ref defaults and required-after-optional.
fn validate_parameters(
    location: &SourceLocation,
    parameters: &[ParameterDeclaration],
) -> Result<(), InterpreterError> {
    let mut seen = HashSet::new();
    for param in parameters {
        if !seen.insert(&param.variable) {
            return Err(InterpreterError::well_known(
                location.clone(),
                keys::DUPLICATE_PARAM,
                [param.variable.to_string()],
            ));
        }
    }

    let mut optional_seen = false;
    for (index, param) in parameters.iter().enumerate() {
        if param.is_byref && param.is_optional() {
            return Err(InterpreterError::well_known(
                location.clone(),
                keys::BYREF_DEFAULT,
                [param.variable.to_string()],
            ));
        }
        if optional_seen && !param.is_optional() {
            return Err(InterpreterError::well_known(
                location.clone(),
                keys::MISSING_DEFAULT,
                [(index + 1).to_string(), param.variable.to_string()],
            ));
        }
        optional_seen |= param.is_optional();
    }

    Ok(())
}

fn capture<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map_or("", |m| m.as_str()).trim()
}

fn include_once_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)^#include-once(\b|$)").expect("include-once regex"))
}

fn startup_register_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(?i)^#onautoitstartregister\s+["'](?P<func>[^"']+)["']"#)
            .expect("startup register regex")
    })
}

fn exit_register_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(?i)^#onautoitexitregister\s+["'](?P<func>[^"']+)["']"#)
            .expect("exit register regex")
    })
}

fn func_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)^(?P<volatile>volatile)?\s*func\s+(?P<name>[a-z_]\w*)\s*\((?P<args>.*)\)$")
            .expect("func regex")
    })
}

fn endfunc_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)^endfunc$").expect("endfunc regex"))
}

fn label_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)^(?P<name>[a-z_]\w*)\s*:$").expect("label regex"))
}

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use au_core::{FunctionReturnValue, ParameterDeclaration, SourceLocation, Variant};

use crate::plugins::{NativeCallFrame, NativeEntryPoint, ParameterCount};

/// Name of the implicit function holding a script's top-level statements.
pub const GLOBAL_FUNC: &str = "$global";

pub const RESERVED_NAMES: &[&str] = &[
    "_", "$_", "$GLOBAL", "GLOBAL", "STATIC", "DIM", "REDIM", "ENUM", "STEP", "LOCAL", "FOR",
    "IN", "NEXT", "DEFAULT", "NULL", "FUNC", "ENDFUNC", "DO", "UNTIL", "WHILE", "WEND", "IF",
    "THEN", "ELSE", "ENDIF", "ELSEIF", "SELECT", "ENDSELECT", "CASE", "SWITCH", "ENDSWITCH",
    "WITH", "ENDWITH", "CONTINUECASE", "CONTINUELOOP", "EXIT", "EXITLOOP", "RETURN", "VOLATILE",
];

pub fn is_reserved_name(name: &str) -> bool {
    let upper = name.to_uppercase();
    RESERVED_NAMES.iter().any(|reserved| *reserved == upper)
}

/// Key under which functions and labels are stored.
pub(crate) fn lookup_key(name: &str) -> String {
    name.trim().to_uppercase()
}

/// A function owned by exactly one scanned script: either defined in script
/// source or provided by the host.
#[derive(Clone)]
pub enum ScriptFunction {
    Defined(Arc<DefinedFunction>),
    Native(Arc<NativeFunction>),
}

impl ScriptFunction {
    pub fn name(&self) -> &str {
        match self {
            Self::Defined(function) => &function.name,
            Self::Native(function) => &function.name,
        }
    }

    pub fn script_path(&self) -> &Path {
        match self {
            Self::Defined(function) => &function.script,
            Self::Native(function) => &function.script,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            Self::Defined(function) => function.location(),
            Self::Native(_) => SourceLocation::unknown(),
        }
    }

    pub fn parameter_count(&self) -> ParameterCount {
        match self {
            Self::Defined(function) => function.parameter_count,
            Self::Native(function) => function.parameter_count,
        }
    }

    pub fn is_main_function(&self) -> bool {
        self.name().eq_ignore_ascii_case(GLOBAL_FUNC)
    }

    pub fn as_defined(&self) -> Option<&Arc<DefinedFunction>> {
        match self {
            Self::Defined(function) => Some(function),
            Self::Native(_) => None,
        }
    }

    pub fn as_native(&self) -> Option<&Arc<NativeFunction>> {
        match self {
            Self::Native(function) => Some(function),
            Self::Defined(_) => None,
        }
    }
}

impl PartialEq for ScriptFunction {
    fn eq(&self, other: &Self) -> bool {
        lookup_key(self.name()) == lookup_key(other.name()) && self.script_path() == other.script_path()
    }
}

impl Eq for ScriptFunction {}

impl Hash for ScriptFunction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        lookup_key(self.name()).hash(state);
        self.script_path().hash(state);
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(function) => write!(f, "{}", function),
            Self::Native(function) => write!(
                f,
                "[native] [{}] Func {}",
                function.script.display(),
                function.name
            ),
        }
    }
}

/// A function declared in script source.
#[derive(Debug, Clone)]
pub struct DefinedFunction {
    name: String,
    script: PathBuf,
    declared_at: SourceLocation,
    parameters: Vec<ParameterDeclaration>,
    parameter_count: ParameterCount,
    is_volatile: bool,
    lines: BTreeMap<SourceLocation, Vec<String>>,
    jump_labels: HashMap<String, JumpLabel>,
}

impl DefinedFunction {
    pub(crate) fn new(
        script: PathBuf,
        name: impl Into<String>,
        declared_at: SourceLocation,
        parameters: Vec<ParameterDeclaration>,
    ) -> Self {
        Self {
            name: name.into(),
            script,
            declared_at,
            parameter_count: ParameterCount::of(&parameters),
            parameters,
            is_volatile: false,
            lines: BTreeMap::new(),
            jump_labels: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn script_path(&self) -> &Path {
        &self.script
    }

    pub fn parameters(&self) -> &[ParameterDeclaration] {
        &self.parameters
    }

    pub fn parameter_count(&self) -> ParameterCount {
        self.parameter_count
    }

    pub fn is_volatile(&self) -> bool {
        self.is_volatile
    }

    pub fn is_main_function(&self) -> bool {
        self.name.eq_ignore_ascii_case(GLOBAL_FUNC)
    }

    pub fn declared_at(&self) -> &SourceLocation {
        &self.declared_at
    }

    /// Span from the first to the last recorded body line, or the
    /// declaration itself for an empty body.
    pub fn location(&self) -> SourceLocation {
        match (self.lines.keys().next(), self.lines.keys().next_back()) {
            (Some(first), Some(last)) => first.through(last),
            _ => self.declared_at.clone(),
        }
    }

    /// Body lines in source order.
    pub fn lines(&self) -> Vec<(&SourceLocation, &str)> {
        self.lines
            .iter()
            .flat_map(|(location, lines)| lines.iter().map(move |line| (location, line.as_str())))
            .collect()
    }

    pub fn line_count(&self) -> usize {
        self.lines.values().map(Vec::len).sum()
    }

    pub fn jump_label(&self, name: &str) -> Option<&JumpLabel> {
        self.jump_labels.get(&lookup_key(name))
    }

    pub fn jump_labels(&self) -> impl Iterator<Item = &JumpLabel> {
        self.jump_labels.values()
    }

    pub(crate) fn set_volatile(&mut self, is_volatile: bool) {
        self.is_volatile = is_volatile;
    }

    pub(crate) fn add_line(&mut self, location: SourceLocation, content: impl Into<String>) {
        self.lines.entry(location).or_default().push(content.into());
    }

    pub(crate) fn add_jump_label(&mut self, location: SourceLocation, name: &str) -> &JumpLabel {
        let key = lookup_key(name);
        let label = JumpLabel {
            script: self.script.clone(),
            function: lookup_key(&self.name),
            name: key.clone(),
            location,
        };
        self.jump_labels.insert(key.clone(), label);
        &self.jump_labels[&key]
    }
}

impl fmt::Display for DefinedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .parameters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "[{}] Func {}({})  [{} Lines]",
            self.script.display(),
            self.name,
            params,
            self.line_count()
        )
    }
}

/// A host-provided function with a fixed arity.
pub struct NativeFunction {
    name: String,
    script: PathBuf,
    parameter_count: ParameterCount,
    execute: NativeEntryPoint,
}

impl NativeFunction {
    pub(crate) fn new(
        script: PathBuf,
        name: impl Into<String>,
        parameter_count: ParameterCount,
        execute: NativeEntryPoint,
    ) -> Self {
        Self {
            name: name.into(),
            script,
            parameter_count,
            execute,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_count(&self) -> ParameterCount {
        self.parameter_count
    }

    pub fn execute(&self, frame: &mut dyn NativeCallFrame, args: &[Variant]) -> FunctionReturnValue {
        (self.execute)(frame, args)
    }
}

/// A named jump target inside one defined function.
#[derive(Debug, Clone)]
pub struct JumpLabel {
    script: PathBuf,
    function: String,
    name: String,
    location: SourceLocation,
}

impl JumpLabel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function_name(&self) -> &str {
        &self.function
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }
}

impl PartialEq for JumpLabel {
    fn eq(&self, other: &Self) -> bool {
        self.script == other.script && self.function == other.function && self.name == other.name
    }
}

impl Eq for JumpLabel {}

impl Hash for JumpLabel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.script.hash(state);
        self.function.hash(state);
        self.name.hash(state);
    }
}

#[cfg(test)]
mod function_tests {
    use super::*;

    fn defined(name: &str) -> DefinedFunction {
        DefinedFunction::new(
            PathBuf::from("/scripts/main.au3"),
            name,
            SourceLocation::new("/scripts/main.au3", 3),
            vec![
                ParameterDeclaration::required("a"),
                ParameterDeclaration::optional("b", "0"),
            ],
        )
    }

    #[test]
    fn reserved_names_are_case_insensitive() {
        assert!(is_reserved_name("endfunc"));
        assert!(is_reserved_name("Volatile"));
        assert!(!is_reserved_name("Add"));
    }

    #[test]
    fn location_spans_first_to_last_line_and_falls_back_to_declaration() {
        let mut function = defined("Add");
        assert_eq!(function.location(), SourceLocation::new("/scripts/main.au3", 3));

        function.add_line(SourceLocation::new("/scripts/main.au3", 6), "b");
        function.add_line(SourceLocation::spanning("/scripts/main.au3", 4, 5), "a");
        function.add_line(SourceLocation::new("/scripts/main.au3", 6), "c");
        assert_eq!(
            function.location(),
            SourceLocation::spanning("/scripts/main.au3", 4, 6)
        );
        let lines = function.lines().into_iter().map(|(_, line)| line).collect::<Vec<_>>();
        assert_eq!(lines, vec!["a", "b", "c"]);
        assert_eq!(function.line_count(), 3);
    }

    #[test]
    fn labels_are_case_insensitive_and_compare_structurally() {
        let mut function = defined("Loop");
        let first = function
            .add_jump_label(SourceLocation::new("/scripts/main.au3", 4), " Start ")
            .clone();
        assert_eq!(first.name(), "START");
        assert_eq!(first.function_name(), "LOOP");
        let found = function.jump_label("start").expect("label lookup");
        assert_eq!(found, &first);

        let mut moved = first.clone();
        moved.location = SourceLocation::new("/scripts/main.au3", 9);
        assert_eq!(moved, first);
    }

    #[test]
    fn function_identity_uses_name_and_script() {
        let a = ScriptFunction::Defined(Arc::new(defined("Add")));
        let b = ScriptFunction::Defined(Arc::new(defined("ADD")));
        assert_eq!(a, b);
        assert_eq!(a.parameter_count(), ParameterCount::new(1, 2));
        assert!(!a.is_main_function());
        assert!(a.as_native().is_none());
        assert!(a.to_string().contains("Func Add($a, $b = 0)"));
    }

    #[test]
    fn native_functions_execute_their_entry_point() {
        struct Frame(SourceLocation);
        impl NativeCallFrame for Frame {
            fn location(&self) -> &SourceLocation {
                &self.0
            }
        }

        let native = NativeFunction::new(
            PathBuf::from("<native>"),
            "Echo",
            ParameterCount::new(1, 1),
            Arc::new(|_frame: &mut dyn NativeCallFrame, args: &[Variant]| {
                FunctionReturnValue::success(args[0].clone())
            }),
        );
        let function = ScriptFunction::Native(Arc::new(native));
        assert!(function.location().is_unknown());
        let mut frame = Frame(SourceLocation::unknown());
        let result = function
            .as_native()
            .expect("native")
            .execute(&mut frame, &[Variant::from("hi")]);
        assert_eq!(result.as_success(), Some((&Variant::from("hi"), None)));
    }
}

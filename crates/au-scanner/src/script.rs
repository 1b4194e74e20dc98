use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use au_core::error::keys;
use au_core::{FunctionReturnValue, InterpreterError, SourceLocation, Variant};
use tracing::debug;

use crate::function::{lookup_key, DefinedFunction, ScriptFunction, GLOBAL_FUNC};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    Unloaded,
    Loaded,
}

/// Invokes functions on behalf of the lifecycle; implemented by the evaluator.
pub trait CallFrame {
    fn call(&mut self, function: &ScriptFunction, args: &[Variant]) -> FunctionReturnValue;
}

/// One resolved source file and the functions declared in it.
///
/// Identity is the canonical absolute path: two instances for the same path are
/// equal and hash the same.
pub struct ScannedScript {
    location: PathBuf,
    functions: HashMap<String, ScriptFunction>,
    startup: Vec<(String, SourceLocation)>,
    exit: Vec<(String, SourceLocation)>,
    include_once: bool,
    state: Mutex<ScriptState>,
}

impl ScannedScript {
    pub(crate) fn new(
        location: PathBuf,
        functions: HashMap<String, ScriptFunction>,
        startup: Vec<(String, SourceLocation)>,
        exit: Vec<(String, SourceLocation)>,
        include_once: bool,
    ) -> Self {
        let mut functions = functions;
        if !functions.contains_key(&lookup_key(GLOBAL_FUNC)) {
            let main = DefinedFunction::new(
                location.clone(),
                GLOBAL_FUNC,
                SourceLocation::new(location.to_string_lossy(), 1),
                Vec::new(),
            );
            functions.insert(lookup_key(GLOBAL_FUNC), ScriptFunction::Defined(Arc::new(main)));
        }

        Self {
            location,
            functions,
            startup,
            exit,
            include_once,
            state: Mutex::new(ScriptState::Unloaded),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn include_once(&self) -> bool {
        self.include_once
    }

    pub fn functions(&self) -> impl Iterator<Item = &ScriptFunction> {
        self.functions.values()
    }

    pub fn function(&self, name: &str) -> Option<&ScriptFunction> {
        self.functions.get(&lookup_key(name))
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(&lookup_key(name))
    }

    pub fn main_function(&self) -> Option<&Arc<DefinedFunction>> {
        self.function(GLOBAL_FUNC).and_then(ScriptFunction::as_defined)
    }

    pub fn startup_functions(&self) -> &[(String, SourceLocation)] {
        &self.startup
    }

    pub fn exit_functions(&self) -> &[(String, SourceLocation)] {
        &self.exit
    }

    pub fn state(&self) -> ScriptState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == ScriptState::Loaded
    }

    /// Moves to `Loaded` and runs the registered startup functions.
    pub fn load_script(&self, frame: &mut dyn CallFrame) -> Result<(), InterpreterError> {
        self.transition(frame, ScriptState::Loaded)
    }

    /// Moves to `Unloaded` and runs the registered exit functions.
    pub fn unload_script(&self, frame: &mut dyn CallFrame) -> Result<(), InterpreterError> {
        self.transition(frame, ScriptState::Unloaded)
    }

    /// The state flips before any hook runs, so an error means the transition
    /// happened but a hook failed.
    fn transition(
        &self,
        frame: &mut dyn CallFrame,
        target: ScriptState,
    ) -> Result<(), InterpreterError> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == target {
                return Ok(());
            }
            *state = target;
        }

        let hooks = match target {
            ScriptState::Loaded => &self.startup,
            ScriptState::Unloaded => &self.exit,
        };
        debug!(script = %self.location.display(), state = ?target, hooks = hooks.len(), "script transition");

        for (name, location) in hooks {
            let Some(function) = self.functions.get(name) else {
                return Err(InterpreterError::well_known(
                    location.clone(),
                    keys::UNRESOLVED_FUNC,
                    [name],
                ));
            };
            if function.parameter_count().minimum > 0 {
                return Err(InterpreterError::well_known(
                    function.location(),
                    keys::REGISTER_FUNC_ARGCOUNT,
                    [function.name()],
                ));
            }
            if let FunctionReturnValue::Fatal(error) = frame.call(function, &[]) {
                return Err(error);
            }
        }

        Ok(())
    }
}

impl PartialEq for ScannedScript {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
    }
}

impl Eq for ScannedScript {}

impl Hash for ScannedScript {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.hash(state);
    }
}

impl fmt::Debug for ScannedScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannedScript")
            .field("location", &self.location)
            .field("functions", &self.functions.len())
            .field("include_once", &self.include_once)
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for ScannedScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location.display())
    }
}

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use au_core::error::keys;
use au_core::{InterpreterError, SourceLocation};
use tracing::{debug, trace, warn};

use crate::builder::{build_script, BuildContext};
use crate::function::{lookup_key, NativeFunction, ScriptFunction};
use crate::normalize::normalize_source;
use crate::options::ScannerOptions;
use crate::plugins::{DefaultParameterParser, ParameterParser, PluginRegistry};
use crate::resolver::{canonical_key, FileSystemResolver, IncludeResolver, ResolvedScript};
use crate::script::ScannedScript;

/// Path of the synthetic script owning every host-provided function.
pub const NATIVE_SCRIPT: &str = "<native>";

/// Resolves, scans and caches scripts for one interpreter instance.
///
/// Scripts are cached by canonical path and functions are indexed globally by
/// case-insensitive name. Both caches only ever grow through insert-if-absent,
/// so concurrent scans of the same path settle on a single instance.
pub struct ScriptScanner {
    options: ScannerOptions,
    plugins: PluginRegistry,
    parameter_parser: Arc<dyn ParameterParser>,
    builtin_resolvers: Vec<Arc<dyn IncludeResolver>>,
    scripts: RwLock<HashMap<PathBuf, Arc<ScannedScript>>>,
    functions: RwLock<HashMap<String, ScriptFunction>>,
    search_paths: RwLock<Vec<PathBuf>>,
    system_script: Arc<ScannedScript>,
}

impl ScriptScanner {
    /// Creates a scanner and registers every natively provided function
    /// before any script can be scanned.
    pub fn new(options: ScannerOptions, plugins: PluginRegistry) -> Self {
        let native_path = PathBuf::from(NATIVE_SCRIPT);
        let mut natives = HashMap::new();
        for provided in plugins
            .function_providers()
            .iter()
            .flat_map(|provider| provider.provided_functions())
        {
            let key = lookup_key(&provided.name);
            if natives.contains_key(&key) {
                warn!(function = %provided.name, "native function provided twice; keeping the first");
                continue;
            }
            let function = NativeFunction::new(
                native_path.clone(),
                provided.name,
                provided.parameter_count,
                provided.execute,
            );
            natives.insert(key, ScriptFunction::Native(Arc::new(function)));
        }

        let global_index = natives.clone();
        debug!(natives = global_index.len(), "registered native functions");
        let system_script = Arc::new(ScannedScript::new(
            native_path,
            natives,
            Vec::new(),
            Vec::new(),
            false,
        ));

        #[cfg_attr(not(feature = "remote"), allow(unused_mut))]
        let mut builtin_resolvers: Vec<Arc<dyn IncludeResolver>> = vec![Arc::new(FileSystemResolver)];
        #[cfg(feature = "remote")]
        builtin_resolvers.push(Arc::new(crate::resolver::HttpResolver::default()));
        #[cfg(feature = "remote")]
        builtin_resolvers.push(Arc::new(crate::resolver::FtpResolver::default()));

        Self {
            options,
            plugins,
            parameter_parser: Arc::new(DefaultParameterParser),
            builtin_resolvers,
            scripts: RwLock::new(HashMap::new()),
            functions: RwLock::new(global_index),
            search_paths: RwLock::new(Vec::new()),
            system_script,
        }
    }

    /// Replaces the parameter-list grammar used for function declarations.
    pub fn with_parameter_parser(mut self, parser: Arc<dyn ParameterParser>) -> Self {
        self.parameter_parser = parser;
        self
    }

    pub fn options(&self) -> &ScannerOptions {
        &self.options
    }

    pub fn system_script(&self) -> &Arc<ScannedScript> {
        &self.system_script
    }

    /// Looks a function up in the global index, case-insensitively.
    pub fn try_resolve_function(&self, name: &str) -> Option<ScriptFunction> {
        self.functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&lookup_key(name))
            .cloned()
    }

    pub fn cached_script(&self, path: &Path) -> Option<Arc<ScannedScript>> {
        self.scripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&canonical_key(path))
            .cloned()
    }

    /// Every scanned script, ordered by path.
    pub fn cached_scripts(&self) -> Vec<Arc<ScannedScript>> {
        let mut scripts = self
            .scripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect::<Vec<_>>();
        scripts.sort_by(|left, right| left.location().cmp(right.location()));
        scripts
    }

    /// Directories of successfully scanned files, in registration order.
    pub fn module_search_paths(&self) -> Vec<PathBuf> {
        self.search_paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Locates `path` and reads it. When nothing resolves and the request was
    /// not already relative to the include directory, the include directory is
    /// tried once. Absolute paths join to themselves and are not retried.
    pub fn resolve_script_file(
        &self,
        location: &SourceLocation,
        path: &str,
        relative: bool,
    ) -> Result<ResolvedScript, InterpreterError> {
        if let Some(resolved) = self.try_resolve_script(path) {
            return Ok(resolved);
        }
        if !relative {
            let joined = self.options.include_dir.join(path);
            if joined.as_path() != Path::new(path) {
                if let Some(resolved) = self.try_resolve_script(&joined.to_string_lossy()) {
                    return Ok(resolved);
                }
            }
        }
        Err(InterpreterError::well_known(
            location.clone(),
            keys::UNRESOLVED_SCRIPT,
            [path],
        ))
    }

    /// Resolves and scans `path`, returning the cached script when the same
    /// canonical path was scanned before.
    pub fn scan_script_file(
        &self,
        location: &SourceLocation,
        path: &str,
        relative: bool,
    ) -> Result<Arc<ScannedScript>, InterpreterError> {
        let resolved = self.resolve_script_file(location, path, relative)?;
        self.process_script_file(resolved)
    }

    /// Scans already-resolved source. Nothing is published when the scan
    /// fails.
    pub fn process_script_file(
        &self,
        resolved: ResolvedScript,
    ) -> Result<Arc<ScannedScript>, InterpreterError> {
        let key = canonical_key(&resolved.path);
        if let Some(cached) = self.scripts.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
            trace!(script = %key.display(), "script cache hit");
            return Ok(Arc::clone(cached));
        }

        let file = key.to_string_lossy().into_owned();
        let normalized = normalize_source(&file, &resolved.content, self.options.strict_mode)?;
        let registered = |name: &str| self.try_resolve_function(name);
        let context = BuildContext {
            strict_mode: self.options.strict_mode,
            pragma_processors: self.plugins.pragma_processors(),
            parameter_parser: self.parameter_parser.as_ref(),
            registered: &registered,
        };
        let script = build_script(&key, &normalized, &context)?;

        let script = self.publish(key.clone(), script);
        self.register_search_path(&key);
        Ok(script)
    }

    fn try_resolve_script(&self, path: &str) -> Option<ResolvedScript> {
        if self.options.strict_mode {
            return FileSystemResolver.try_resolve(path).ok().flatten();
        }

        self.builtin_resolvers
            .iter()
            .chain(self.plugins.include_resolvers())
            .find_map(|resolver| match resolver.try_resolve(path) {
                Ok(found) => found,
                Err(error) => {
                    trace!(path, %error, "include resolver failed; trying the next one");
                    None
                }
            })
    }

    /// Inserts `script` unless another scan of the same path won the race, in
    /// which case the winner is returned. Functions enter the global index
    /// while the script table is still locked.
    fn publish(&self, key: PathBuf, script: ScannedScript) -> Arc<ScannedScript> {
        let mut scripts = self.scripts.write().unwrap_or_else(PoisonError::into_inner);
        let script = match scripts.entry(key) {
            Entry::Occupied(existing) => return Arc::clone(existing.get()),
            Entry::Vacant(slot) => Arc::clone(slot.insert(Arc::new(script))),
        };

        let mut functions = self.functions.write().unwrap_or_else(PoisonError::into_inner);
        for function in script.functions().filter(|function| !function.is_main_function()) {
            functions
                .entry(lookup_key(function.name()))
                .or_insert_with(|| function.clone());
        }
        debug!(
            script = %script.location().display(),
            functions = script.functions().count(),
            "published scanned script"
        );
        script
    }

    fn register_search_path(&self, key: &Path) {
        let Some(dir) = key.parent().filter(|dir| dir.is_dir()) else {
            return;
        };
        let mut paths = self.search_paths.write().unwrap_or_else(PoisonError::into_inner);
        if !paths.iter().any(|known| known == dir) {
            debug!(dir = %dir.display(), "registered module search path");
            paths.push(dir.to_path_buf());
        }
    }
}

use std::error::Error;
use std::sync::Arc;

use au_core::error::keys;
use au_core::{
    FunctionReturnValue, InterpreterError, ParameterDeclaration, SourceLocation, Variant,
};

use crate::resolver::IncludeResolver;

/// Handles `#pragma OPTION(KEY[, VALUE])` for one option name.
pub trait PragmaProcessor: Send + Sync {
    fn pragma_name(&self) -> &str;
    fn can_process_key(&self, key: &str) -> bool;
    fn process_pragma(
        &self,
        location: &SourceLocation,
        key: &str,
        value: Option<&str>,
    ) -> Result<(), InterpreterError>;
}

/// The evaluator-side context a native function runs in.
pub trait NativeCallFrame {
    fn location(&self) -> &SourceLocation;
}

pub type NativeEntryPoint =
    Arc<dyn Fn(&mut dyn NativeCallFrame, &[Variant]) -> FunctionReturnValue + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterCount {
    pub minimum: usize,
    pub maximum: usize,
}

impl ParameterCount {
    pub fn new(minimum: usize, maximum: usize) -> Self {
        Self {
            minimum,
            maximum: maximum.max(minimum),
        }
    }

    pub fn of(parameters: &[ParameterDeclaration]) -> Self {
        Self::new(
            parameters.iter().filter(|param| !param.is_optional()).count(),
            parameters.len(),
        )
    }
}

#[derive(Clone)]
pub struct ProvidedNativeFunction {
    pub name: String,
    pub parameter_count: ParameterCount,
    pub execute: NativeEntryPoint,
}

impl ProvidedNativeFunction {
    pub fn new<F>(name: impl Into<String>, parameter_count: ParameterCount, execute: F) -> Self
    where
        F: Fn(&mut dyn NativeCallFrame, &[Variant]) -> FunctionReturnValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parameter_count,
            execute: Arc::new(execute),
        }
    }
}

pub trait FunctionProvider: Send + Sync {
    fn provided_functions(&self) -> Vec<ProvidedNativeFunction>;
}

/// Turns the raw text between a declaration's parentheses into parameters.
pub trait ParameterParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<Vec<ParameterDeclaration>, Box<dyn Error + Send + Sync>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultParameterParser;

impl ParameterParser for DefaultParameterParser {
    fn parse(&self, raw: &str) -> Result<Vec<ParameterDeclaration>, Box<dyn Error + Send + Sync>> {
        Ok(au_parser::parse_parameter_list(raw)?)
    }
}

/// Everything plugins contribute to scanning.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    pragma_processors: Vec<Arc<dyn PragmaProcessor>>,
    include_resolvers: Vec<Arc<dyn IncludeResolver>>,
    function_providers: Vec<Arc<dyn FunctionProvider>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pragma processor; only one processor may claim an option name.
    pub fn register_pragma_processor(
        &mut self,
        processor: Arc<dyn PragmaProcessor>,
    ) -> Result<(), InterpreterError> {
        let name = processor.pragma_name();
        if self
            .pragma_processors
            .iter()
            .any(|existing| existing.pragma_name().eq_ignore_ascii_case(name))
        {
            return Err(InterpreterError::well_known(
                SourceLocation::unknown(),
                keys::DUPLICATE_PRAGMA_PROCESSOR,
                [name],
            ));
        }
        self.pragma_processors.push(processor);
        Ok(())
    }

    pub fn register_include_resolver(&mut self, resolver: Arc<dyn IncludeResolver>) {
        self.include_resolvers.push(resolver);
    }

    pub fn register_function_provider(&mut self, provider: Arc<dyn FunctionProvider>) {
        self.function_providers.push(provider);
    }

    pub fn pragma_processors(&self) -> &[Arc<dyn PragmaProcessor>] {
        &self.pragma_processors
    }

    pub fn include_resolvers(&self) -> &[Arc<dyn IncludeResolver>] {
        &self.include_resolvers
    }

    pub fn function_providers(&self) -> &[Arc<dyn FunctionProvider>] {
        &self.function_providers
    }
}

use std::sync::{Arc, OnceLock};

use au_core::error::keys;
use au_core::{InterpreterError, SourceLocation};
use regex::{Captures, Regex};

use crate::plugins::PragmaProcessor;

pub const COMPILE_OPTION: &str = "COMPILE";

/// Keys accepted by `#pragma compile(...)`.
pub const COMPILE_KEYS: &[&str] = &[
    "OUT",
    "ICON",
    "EXECLEVEL",
    "UPX",
    "AUTOITEXECUTEALLOWED",
    "CONSOLE",
    "COMPRESSION",
    "COMPATIBILITY",
    "X64",
    "INPUTBOXRES",
    "COMMENTS",
    "COMPANYNAME",
    "FILEDESCRIPTION",
    "FILEVERSION",
    "INTERNALNAME",
    "LEGALCOPYRIGHT",
    "LEGALTRADEMARKS",
    "ORIGINALFILENAME",
    "PRODUCTNAME",
    "PRODUCTVERSION",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PragmaDirective {
    pub option: String,
    pub key: String,
    pub value: Option<String>,
}

impl PragmaDirective {
    pub(crate) fn from_captures(caps: &Captures<'_>) -> Self {
        let option = caps.name("option").map_or("", |m| m.as_str()).trim();
        let params = caps.name("params").map_or("", |m| m.as_str());
        let (key, value) = match params.find(',') {
            Some(index) => (&params[..index], Some(params[index + 1..].trim().to_string())),
            None => (params, None),
        };

        Self {
            option: option.to_uppercase(),
            key: key.trim().to_uppercase(),
            value,
        }
    }
}

pub fn parse_pragma(line: &str) -> Option<PragmaDirective> {
    pragma_regex()
        .captures(line)
        .map(|caps| PragmaDirective::from_captures(&caps))
}

/// Applies one pragma. `compile` is handled here; every other option goes to
/// the processor registered for it.
pub fn process_pragma(
    location: &SourceLocation,
    directive: &PragmaDirective,
    processors: &[Arc<dyn PragmaProcessor>],
) -> Result<(), InterpreterError> {
    let PragmaDirective { option, key, value } = directive;

    if option == COMPILE_OPTION {
        if !COMPILE_KEYS.contains(&key.as_str()) {
            return Err(unhandled_key(location, key, option));
        }
        return Err(InterpreterError::well_known(
            location.clone(),
            keys::NOT_YET_IMPLEMENTED,
            ["compile"],
        ));
    }

    match processors
        .iter()
        .find(|processor| processor.pragma_name().eq_ignore_ascii_case(option))
    {
        Some(processor) if processor.can_process_key(key) => {
            processor.process_pragma(location, key, value.as_deref())
        }
        Some(_) => Err(unhandled_key(location, key, option)),
        None => Err(InterpreterError::well_known(
            location.clone(),
            keys::UNHANDLED_PRAGMA_OPTION,
            [option],
        )),
    }
}

fn unhandled_key(location: &SourceLocation, key: &str, option: &str) -> InterpreterError {
    InterpreterError::well_known(location.clone(), keys::UNHANDLED_PRAGMA_KEY, [key, option])
}

pub(crate) fn pragma_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)^#pragma\s+(?P<option>[a-z_]\w+)\b\s*(?:\((?P<params>.*)\))?\s*")
            .expect("pragma regex")
    })
}

#[cfg(test)]
mod pragma_tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProcessor {
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl PragmaProcessor for RecordingProcessor {
        fn pragma_name(&self) -> &str {
            "Trace"
        }

        fn can_process_key(&self, key: &str) -> bool {
            key == "LEVEL"
        }

        fn process_pragma(
            &self,
            _location: &SourceLocation,
            key: &str,
            value: Option<&str>,
        ) -> Result<(), InterpreterError> {
            self.seen
                .lock()
                .expect("lock")
                .push((key.to_string(), value.map(str::to_string)));
            Ok(())
        }
    }

    fn loc() -> SourceLocation {
        SourceLocation::new("p.au3", 1)
    }

    #[test]
    fn parses_option_key_and_value() {
        let directive = parse_pragma("#pragma compile(Out, my app.exe )").expect("pragma");
        assert_eq!(directive.option, "COMPILE");
        assert_eq!(directive.key, "OUT");
        assert_eq!(directive.value.as_deref(), Some("my app.exe"));

        let keyless = parse_pragma("#Pragma trace(level)").expect("pragma");
        assert_eq!(keyless.key, "LEVEL");
        assert!(keyless.value.is_none());
        assert!(parse_pragma("pragma compile(out)").is_none());
    }

    #[test]
    fn compile_keys_are_recognized_but_not_implemented() {
        let directive = parse_pragma("#pragma compile(ExecLevel, requireAdministrator)")
            .expect("pragma");
        let error = process_pragma(&loc(), &directive, &[]).expect_err("compile");
        assert!(error.is(keys::NOT_YET_IMPLEMENTED));
        assert_eq!(error.args, vec!["compile"]);
        assert_eq!(COMPILE_KEYS.len(), 20);
    }

    #[test]
    fn unknown_compile_key_is_unhandled() {
        let directive = parse_pragma("#pragma compile(Bogus, 1)").expect("pragma");
        let error = process_pragma(&loc(), &directive, &[]).expect_err("bogus key");
        assert!(error.is(keys::UNHANDLED_PRAGMA_KEY));
        assert_eq!(error.args, vec!["BOGUS", "COMPILE"]);
    }

    #[test]
    fn other_options_dispatch_to_matching_processor() {
        let processor = Arc::new(RecordingProcessor::default());
        let processors = vec![processor.clone() as Arc<dyn PragmaProcessor>];

        let directive = parse_pragma("#pragma TRACE(level, 3)").expect("pragma");
        process_pragma(&loc(), &directive, &processors).expect("handled");
        assert_eq!(
            processor.seen.lock().expect("lock").as_slice(),
            &[("LEVEL".to_string(), Some("3".to_string()))]
        );

        let rejected = parse_pragma("#pragma trace(depth)").expect("pragma");
        let error = process_pragma(&loc(), &rejected, &processors).expect_err("rejected key");
        assert!(error.is(keys::UNHANDLED_PRAGMA_KEY));

        let unknown = parse_pragma("#pragma unknown(x)").expect("pragma");
        let error = process_pragma(&loc(), &unknown, &processors).expect_err("no processor");
        assert!(error.is(keys::UNHANDLED_PRAGMA_OPTION));
        assert_eq!(error.args, vec!["UNKNOWN"]);
    }
}

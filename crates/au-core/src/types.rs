use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub const UNKNOWN_FILE: &str = "<unknown>";

/// A file plus an inclusive range of 1-based line numbers.
///
/// Ordering is by file, then by start line, then by end line, which keeps
/// the body lines of a function in source order when used as a map key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            start_line: line,
            end_line: line,
        }
    }

    pub fn spanning(file: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            file: file.into(),
            start_line,
            end_line: end_line.max(start_line),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_FILE, 0)
    }

    pub fn is_unknown(&self) -> bool {
        self.file == UNKNOWN_FILE
    }

    pub fn is_single_line(&self) -> bool {
        self.start_line == self.end_line
    }

    /// Extends this location so that it ends where `other` ends.
    pub fn through(&self, other: &SourceLocation) -> Self {
        Self::spanning(self.file.clone(), self.start_line, other.end_line)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_line() {
            write!(f, "{}:{}", self.file, self.start_line)
        } else {
            write!(f, "{}:{}-{}", self.file, self.start_line, self.end_line)
        }
    }
}

/// A variable identifier. Names are compared without regard to case and
/// without the leading `$` sigil.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.strip_prefix('$').unwrap_or(&name).to_string();
        Self { name }
    }

    fn normalized(&self) -> String {
        self.name.to_uppercase()
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub variable: Variable,
    pub is_byref: bool,
    pub is_const: bool,
    /// Raw default-value expression; present exactly when the parameter is optional.
    pub default_value: Option<String>,
}

impl ParameterDeclaration {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            variable: Variable::new(name),
            is_byref: false,
            is_const: false,
            default_value: None,
        }
    }

    pub fn optional(name: impl Into<String>, default_value: impl Into<String>) -> Self {
        Self {
            default_value: Some(default_value.into()),
            ..Self::required(name)
        }
    }

    pub fn by_ref(mut self) -> Self {
        self.is_byref = true;
        self
    }

    pub fn is_optional(&self) -> bool {
        self.default_value.is_some()
    }
}

impl fmt::Display for ParameterDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_byref {
            write!(f, "ByRef ")?;
        }
        if self.is_const {
            write!(f, "Const ")?;
        }
        write!(f, "{}", self.variable)?;
        if let Some(default_value) = &self.default_value {
            write!(f, " = {}", default_value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod types_tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn locations_order_by_file_then_line() {
        let mut set = BTreeSet::new();
        set.insert(SourceLocation::new("b.au3", 1));
        set.insert(SourceLocation::spanning("a.au3", 4, 6));
        set.insert(SourceLocation::new("a.au3", 2));
        let ordered = set.into_iter().collect::<Vec<_>>();
        assert_eq!(ordered[0], SourceLocation::new("a.au3", 2));
        assert_eq!(ordered[1], SourceLocation::spanning("a.au3", 4, 6));
        assert_eq!(ordered[2].file, "b.au3");
    }

    #[test]
    fn location_display_and_span_helpers() {
        let start = SourceLocation::new("main.au3", 3);
        let merged = start.through(&SourceLocation::new("main.au3", 5));
        assert_eq!(merged.to_string(), "main.au3:3-5");
        assert_eq!(start.to_string(), "main.au3:3");
        assert!(SourceLocation::unknown().is_unknown());
        assert_eq!(SourceLocation::spanning("x", 4, 2).end_line, 4);
    }

    #[test]
    fn variables_compare_case_insensitively_without_sigil() {
        assert_eq!(Variable::new("$iValue"), Variable::new("IVALUE"));
        assert_ne!(Variable::new("$a"), Variable::new("$b"));
        assert_eq!(Variable::new("a").to_string(), "$a");
    }

    #[test]
    fn parameter_display_includes_modifiers_and_default() {
        let param = ParameterDeclaration::required("$x").by_ref();
        assert_eq!(param.to_string(), "ByRef $x");
        let optional = ParameterDeclaration::optional("y", "0");
        assert!(optional.is_optional());
        assert_eq!(optional.to_string(), "$y = 0");
    }

    #[test]
    fn parameter_declaration_serializes() {
        let json = serde_json::to_string(&ParameterDeclaration::optional("a", "1"))
            .expect("serialize");
        assert!(json.contains("\"default_value\":\"1\""));
    }
}

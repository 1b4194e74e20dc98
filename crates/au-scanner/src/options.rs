use std::path::PathBuf;

/// Scanner configuration, passed explicitly into [`crate::ScriptScanner::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerOptions {
    /// Accept only strict language features: no one-line functions, no jump
    /// labels, filesystem-only include resolution.
    pub strict_mode: bool,
    /// Fallback directory for include requests that do not resolve directly.
    pub include_dir: PathBuf,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            include_dir: default_include_dir(),
        }
    }
}

impl ScannerOptions {
    pub fn strict(mut self, strict_mode: bool) -> Self {
        self.strict_mode = strict_mode;
        self
    }

    pub fn with_include_dir(mut self, include_dir: impl Into<PathBuf>) -> Self {
        self.include_dir = include_dir.into();
        self
    }
}

fn default_include_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("include")))
        .unwrap_or_else(|| PathBuf::from("include"))
}

use std::fmt::Write as _;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use au_core::{InterpreterError, SourceLocation};
use au_scanner::{ScannedScript, ScriptScanner};
use tracing::{debug, info};

use crate::models::{ErrorReport, ScanReport, ScriptReport};

type ScanOutcome = (PathBuf, Result<Arc<ScannedScript>, InterpreterError>);

/// Scans every file against one shared scanner, spreading the files over a
/// bounded number of scoped threads. Outcomes keep the order of `files`.
pub(crate) fn scan_files(scanner: &ScriptScanner, files: &[PathBuf]) -> Vec<ScanOutcome> {
    if files.is_empty() {
        return Vec::new();
    }

    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(files.len());
    let chunk_size = files.len().div_ceil(workers);
    debug!(files = files.len(), workers, "scanning scripts");

    thread::scope(|scope| {
        let handles = files
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || scan_chunk(scanner, chunk)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(outcomes) => outcomes,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

fn scan_chunk(scanner: &ScriptScanner, chunk: &[PathBuf]) -> Vec<ScanOutcome> {
    chunk
        .iter()
        .map(|file| {
            let result =
                scanner.scan_script_file(&SourceLocation::unknown(), &file.to_string_lossy(), false);
            if let Ok(script) = &result {
                info!(script = %script.location().display(), "scanned script");
            }
            (file.clone(), result)
        })
        .collect()
}

pub(crate) fn build_report(outcomes: &[ScanOutcome]) -> ScanReport {
    let mut report = ScanReport::default();
    for (file, result) in outcomes {
        match result {
            Ok(script) => report.scripts.push(ScriptReport::from_script(script)),
            Err(error) => report.errors.push(ErrorReport::from_error(file, error)),
        }
    }
    report
}

pub(crate) fn render_text(report: &ScanReport) -> String {
    let mut out = String::new();

    for script in &report.scripts {
        let _ = write!(out, "script {}", script.path);
        if script.include_once {
            out.push_str(" [include-once]");
        }
        out.push('\n');

        for function in &script.functions {
            let params = function
                .parameters
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let volatile = if function.volatile { "Volatile " } else { "" };
            let _ = writeln!(
                out,
                "  {}Func {}({})  [{} Lines] @ {}",
                volatile, function.name, params, function.line_count, function.location
            );
            for label in &function.labels {
                let _ = writeln!(out, "    label {} @ {}", label.name, label.location);
            }
        }
        if !script.startup_functions.is_empty() {
            let _ = writeln!(out, "  startup: {}", script.startup_functions.join(", "));
        }
        if !script.exit_functions.is_empty() {
            let _ = writeln!(out, "  exit: {}", script.exit_functions.join(", "));
        }
    }

    for error in &report.errors {
        let _ = write!(out, "error {} at {}", error.key, error.location);
        if !error.args.is_empty() {
            let _ = write!(out, " ({})", error.args.join(", "));
        }
        let _ = writeln!(out, " while scanning {}", error.file);
    }

    out
}

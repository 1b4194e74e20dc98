use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{map_cli_source_walk, CliError};

/// Expands the command-line paths into script files: files are taken as
/// given, directories are walked for `.au3` files. The result is sorted and
/// free of duplicates.
pub(crate) fn collect_script_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, CliError> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            return Err(CliError::new(
                "CLI_SOURCE_NOT_FOUND",
                format!("path does not exist: {}", path.display()),
            ));
        }

        let before = files.len();
        for entry in WalkDir::new(path).follow_links(false) {
            let entry = entry.map_err(map_cli_source_walk)?;
            if entry.file_type().is_file() && is_script_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        if files.len() == before {
            return Err(CliError::new(
                "CLI_SOURCE_EMPTY",
                format!("No .au3 files under {}", path.display()),
            ));
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn is_script_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("au3"))
}

use std::ffi::OsString;

use au_scanner::{PluginRegistry, ScannerOptions, ScriptScanner};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli_args;
mod error_map;
mod models;
mod scan_runner;
mod source_loader;

pub(crate) use cli_args::Cli;
pub(crate) use error_map::{emit_error, map_cli_report_json, map_cli_source_walk, CliError};
pub(crate) use scan_runner::{build_report, render_text, scan_files};
pub(crate) use source_loader::collect_script_files;

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, CliError> {
    let files = collect_script_files(&cli.paths)?;
    let scanner = ScriptScanner::new(scanner_options(&cli), PluginRegistry::new());

    let outcomes = scan_files(&scanner, &files);
    let report = build_report(&outcomes);

    if cli.json {
        let json = serde_json::to_string_pretty(&report).map_err(map_cli_report_json)?;
        println!("{}", json);
    } else {
        print!("{}", render_text(&report));
    }

    Ok(if report.is_success() { 0 } else { 1 })
}

fn scanner_options(cli: &Cli) -> ScannerOptions {
    let options = ScannerOptions::default().strict(cli.strict);
    match &cli.include_dir {
        Some(dir) => options.with_include_dir(dir),
        None => options,
    }
}

/// `RUST_LOG` wins over the `-v` count.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests;

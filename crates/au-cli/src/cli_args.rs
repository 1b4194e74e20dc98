use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Debug, Parser)]
#[command(name = "au-scan")]
#[command(about = "Scan AutoIt scripts and print their function tables")]
pub(crate) struct Cli {
    /// Reject experimental syntax and resolve includes from the filesystem only.
    #[arg(long = "strict")]
    pub(crate) strict: bool,
    #[arg(long = "include-dir")]
    pub(crate) include_dir: Option<PathBuf>,
    #[arg(long = "json")]
    pub(crate) json: bool,
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub(crate) verbose: u8,
    /// Script files or directories to walk for `.au3` files.
    #[arg(required = true)]
    pub(crate) paths: Vec<PathBuf>,
}

// src/cli.rs

//! CLI definitions for the forma formatter driver.
//!
//! Flag parsing only; the pipeline lives in the library modules and the
//! exit-code mapping in `main`.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "forma")]
#[command(author = "Forma Project")]
#[command(version)]
#[command(
    about = "Format source trees with containerized formatters",
    long_about = None
)]
pub struct Cli {
    /// Dry run: report unformatted files without rewriting them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Stream build engine progress to stderr
    #[arg(short = '2', long = "engine-progress")]
    pub engine_progress: bool,

    /// Files or directories to format (defaults to the current directory)
    pub paths: Vec<PathBuf>,
}

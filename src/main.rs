// src/main.rs

use anyhow::Context;
use clap::Parser;
use forma::cli::Cli;
use forma::{CancelToken, Error, Pipeline, RunConfig};
use std::io::{self, Write};
use std::process::ExitCode;

/// Exit code for a dry run that found unformatted files
const EXIT_UNFORMATTED: u8 = 2;

fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr; stdout is reserved for change reports.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let root = std::env::current_dir().context("cannot determine working directory")?;

    let pipeline = Pipeline::new(root, RunConfig::from_env()).dry_run(cli.dry_run);
    let cancel = CancelToken::new();
    let mut stdout = io::stdout();

    let outcome = if cli.engine_progress {
        pipeline.run(&cancel, &mut stdout, &mut io::stderr(), &cli.paths)
    } else {
        pipeline.run(&cancel, &mut stdout, &mut io::sink(), &cli.paths)
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(Error::UnformattedFiles) => Ok(ExitCode::from(EXIT_UNFORMATTED)),
        Err(err @ Error::BuildFailed) if !cli.engine_progress => {
            // Progress was discarded; point at the flag that shows it.
            writeln!(stdout, "forma: {err}, maybe retry with flag -2")?;
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            writeln!(stdout, "forma: {err}")?;
            Ok(ExitCode::FAILURE)
        }
    }
}

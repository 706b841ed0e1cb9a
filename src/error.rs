// src/error.rs

//! Error taxonomy for the formatting pipeline.
//!
//! Usability errors carry the offending path and abort a run before any
//! file is touched. Engine errors distinguish "the engine could not be
//! run" from "the engine ran and rejected the build". The dry-run signal
//! is an error value so callers can gate CI on it.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors surfaced by the formatting pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// The candidate path does not exist
    #[error("unusable file {}: no such file or directory", path.display())]
    NotFound { path: PathBuf },

    /// The candidate path exists but is not a regular file (symlink,
    /// device, directory where a file was expected, ...)
    #[error("unusable file {}: not a regular file", path.display())]
    NotRegular { path: PathBuf },

    /// The file resolves outside the working root
    #[error("unusable file {}: not under {}", path.display(), root.display())]
    NotUnderRoot { path: PathBuf, root: PathBuf },

    /// The file cannot be opened for writing
    #[error("unusable file {}: permission denied", path.display())]
    NotWritable { path: PathBuf },

    /// Any other per-file I/O failure
    #[error("unusable file {}: {source}", path.display())]
    Unusable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No build engine executable could be located
    #[error(
        "no build engine found: curl -fsSL https://get.docker.com -o get-docker.sh && sudo sh get-docker.sh"
    )]
    EngineMissing,

    /// The engine ran and rejected the build (exit status 1)
    #[error("build engine failed with status 1")]
    BuildFailed,

    /// The engine exited abnormally with some other status
    #[error("build engine exited abnormally: {status}")]
    EngineTerminated { status: ExitStatus },

    /// The invocation was cancelled by the caller
    #[error("build cancelled")]
    Cancelled,

    /// A dry run discovered files that would have been rewritten
    #[error("unformatted files found")]
    UnformattedFiles,

    /// Archive or stream I/O failure; fatal, never retried
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

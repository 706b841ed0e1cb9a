// src/eligibility.rs

//! Per-file eligibility policy.
//!
//! Three independent checks gate every selected file: it must be a regular
//! file, it must live under the working root, and (outside dry runs) it
//! must be writable. The whole set passes before anything is read or
//! invoked, so a single ineligible file leaves the filesystem untouched.

use crate::error::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use tracing::debug;

/// Verify every selected file before the run proceeds.
///
/// Fails fast on the first violation. The writability check is skipped in
/// dry-run mode since nothing will be rewritten.
pub fn check_all(root: &Path, files: &[impl AsRef<Path>], dry_run: bool) -> Result<()> {
    for path in files {
        let path = path.as_ref();
        ensure_regular(path)?;
        ensure_under_root(root, path)?;
        if !dry_run {
            ensure_writable(path)?;
        }
    }
    debug!(files = files.len(), dry_run, "all candidates eligible");
    Ok(())
}

/// The path must resolve to a regular file without dereferencing symlinks.
pub fn ensure_regular(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_file() => Ok(()),
        Ok(_) => Err(Error::NotRegular {
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == io::ErrorKind::NotFound => Err(Error::NotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(Error::Unusable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// The file's absolute path must have the working root as a prefix.
///
/// `path` is expected to be absolute already (selection resolves it); the
/// comparison is lexical and also covers the same-volume requirement,
/// since two paths sharing a prefix share its device.
pub fn ensure_under_root(root: &Path, path: &Path) -> Result<()> {
    if path.starts_with(root) {
        Ok(())
    } else {
        Err(Error::NotUnderRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })
    }
}

/// The file must be openable for read-write.
pub fn ensure_writable(path: &Path) -> Result<()> {
    match OpenOptions::new().read(true).write(true).open(path) {
        Ok(_) => Ok(()),
        Err(source) => Err(classify_open_error(path, source)),
    }
}

/// Permission failures are reported distinctly from other I/O failures.
fn classify_open_error(path: &Path, source: io::Error) -> Error {
    match source.kind() {
        io::ErrorKind::PermissionDenied => Error::NotWritable {
            path: path.to_path_buf(),
        },
        io::ErrorKind::NotFound => Error::NotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Unusable {
            path: path.to_path_buf(),
            source,
        },
    }
}

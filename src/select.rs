// src/select.rs

//! Candidate path selection.
//!
//! Turns caller-supplied paths (files or directories, absolute or
//! root-relative) into the deduplicated, lexicographically sorted set of
//! regular files submitted to the build engine. Directory candidates are
//! enumerated recursively with hidden entries pruned.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// The outcome of candidate selection
#[derive(Debug)]
pub struct Selection {
    /// Deduplicated, sorted absolute file paths
    pub files: Vec<PathBuf>,
    /// Whether any file was discovered by directory traversal rather than
    /// being named explicitly. Controls how strictly the build manifest
    /// treats files no formatter handles.
    pub traversed: bool,
}

/// Resolve candidate paths into the set of files to submit.
///
/// With no candidates the working root itself is selected, which formats
/// everything beneath it. Candidates that are neither regular files nor
/// directories fail selection.
pub fn select(root: &Path, candidates: &[PathBuf]) -> Result<Selection> {
    let defaulted = [root.to_path_buf()];
    let candidates = if candidates.is_empty() {
        &defaulted[..]
    } else {
        candidates
    };

    let mut files = BTreeSet::new();
    let mut traversed = false;
    for candidate in candidates {
        if candidate.as_os_str().is_empty() {
            return Err(Error::NotFound {
                path: candidate.clone(),
            });
        }
        let path = resolve(root, candidate);
        let meta = fs::symlink_metadata(&path)
            .map_err(|source| classify_stat_error(candidate, source))?;
        if meta.file_type().is_file() {
            files.insert(path);
        } else if meta.file_type().is_dir() {
            traversed |= walk_directory(&path, &mut files)? > 0;
        } else {
            return Err(Error::NotRegular {
                path: candidate.clone(),
            });
        }
    }

    debug!(files = files.len(), traversed, "selected candidate files");
    Ok(Selection {
        files: files.into_iter().collect(),
        traversed,
    })
}

/// Recursively collect regular files beneath `dir`, returning how many
/// were found. Hidden files are skipped and hidden directories pruned
/// entirely; the traversal root itself is exempt so explicitly named
/// dot-directories still resolve. Symlinks and other non-regular entries
/// are silently ignored.
fn walk_directory(dir: &Path, files: &mut BTreeSet<PathBuf>) -> Result<usize> {
    let mut found = 0;
    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
    {
        let entry = entry.map_err(|source| Error::Unusable {
            path: source
                .path()
                .unwrap_or(dir)
                .to_path_buf(),
            source: source.into(),
        })?;
        if entry.file_type().is_file() {
            files.insert(entry.path().to_path_buf());
            found += 1;
        }
    }
    Ok(found)
}

fn is_hidden(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

fn classify_stat_error(path: &Path, source: io::Error) -> Error {
    if source.kind() == io::ErrorKind::NotFound {
        Error::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        Error::Unusable {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Anchor `path` at `root` and fold away `.` and `..` components.
/// Resolution is lexical; symlinks are not chased.
pub(crate) fn resolve(root: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

// src/archive.rs

//! Input archive construction.
//!
//! The engine consumes one tar stream: the manifest first, then every
//! selected file under the `a/` input namespace. Entry order is
//! deterministic so identical inputs produce identical archives.

use crate::error::{Error, Result};
use crate::manifest;
use crate::select;
use std::fs;
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};
use tracing::debug;

/// Archive namespace prefix for files sent to the engine
pub const INPUT_PREFIX: &str = "a";
/// Archive namespace prefix for transformed files coming back
pub const OUTPUT_PREFIX: &str = "b/";
/// Reserved entry name carrying free-text diagnostics back to the caller
pub const DIAGNOSTIC_ENTRY: &str = "stdout";

/// Manifest entries are read-restricted and never executable
const MANIFEST_MODE: u32 = 0o200;
/// Submitted files only ever need owner read-write
const FILE_MODE: u32 = 0o600;

/// A validated file with its contents, read once for the whole run
#[derive(Debug)]
pub struct SelectedFile {
    /// Root-relative path, which doubles as the archive entry name
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl SelectedFile {
    /// Read a vetted file into memory, recording it under its
    /// root-relative path so output entries round-trip.
    pub fn read(root: &Path, path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|source| Error::Unusable {
            path: path.to_path_buf(),
            source,
        })?;
        let resolved = select::resolve(root, path);
        let relative = resolved
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or(resolved);
        Ok(Self {
            path: relative,
            data,
        })
    }
}

/// Serialize the manifest and all selected files into one tar stream.
///
/// The manifest entry comes first under its fixed name; files follow in
/// the caller's (sorted) order under `a/`. Declared entry sizes always
/// match content lengths since headers are derived from the bytes.
pub fn build_input(manifest: &[u8], files: &[SelectedFile]) -> Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());
    append_entry(&mut builder, manifest::MANIFEST_NAME, MANIFEST_MODE, manifest)?;
    for file in files {
        let name = format!("{INPUT_PREFIX}/{}", file.path.display());
        append_entry(&mut builder, &name, FILE_MODE, &file.data)?;
    }
    let buf = builder.into_inner()?;
    debug!(
        entries = 1 + files.len(),
        bytes = buf.len(),
        "input archive sealed"
    );
    Ok(buf)
}

fn append_entry(
    builder: &mut Builder<Vec<u8>>,
    name: &str,
    mode: u32,
    data: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_mode(mode);
    header.set_size(data.len() as u64);
    header.set_cksum();
    builder.append_data(&mut header, name, data)?;
    Ok(())
}
